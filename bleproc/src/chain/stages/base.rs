//! Base stage: the last link, declares readiness.

use crate::chain::{Progress, Stage, StageContext, StageError, StageId, StageKind};
use bleproc_shared::constants::stages as stage_names;

/// Innermost stage. Succeeds immediately; the chain then reports ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseStage;

impl Stage for BaseStage {
    fn id(&self) -> StageId {
        StageId::from(stage_names::BASE)
    }

    fn kind(&self) -> StageKind {
        StageKind::Base
    }

    fn begin(&self, cx: StageContext) -> Result<Progress, StageError> {
        tracing::info!(cycle = cx.cycle(), "Radio stack configured, signalling ready");
        Ok(Progress::Done)
    }
}
