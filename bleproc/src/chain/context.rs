//! Per-invocation context handed to a stage.

use super::InitializationChain;
use super::types::StageId;
use crate::scheduler::SchedulerHandle;
use bleproc_shared::errors::RadioError;
use bleproc_shared::radio::{Completion, RadioStack};
use std::sync::{Arc, Weak};

/// Everything a stage may touch while it runs.
pub struct StageContext {
    radio: Arc<dyn RadioStack>,
    completer: StageCompleter,
}

impl StageContext {
    pub(crate) fn new(radio: Arc<dyn RadioStack>, completer: StageCompleter) -> Self {
        Self { radio, completer }
    }

    pub fn radio(&self) -> &Arc<dyn RadioStack> {
        &self.radio
    }

    pub fn stage(&self) -> &StageId {
        &self.completer.stage
    }

    pub fn cycle(&self) -> u64 {
        self.completer.cycle
    }

    /// Take the one-shot completer for this invocation.
    pub fn into_completer(self) -> StageCompleter {
        self.completer
    }

    /// Completer as a radio [`Completion`], ready to pass to an async call.
    pub fn into_completion(self) -> Completion {
        self.completer.into_completion()
    }
}

/// One-shot continuation for a stage's asynchronous work.
///
/// Carries the chain, cycle and stage identity, so the result is attributed
/// structurally. Completing never runs chain code inline; the result is
/// queued on the scheduler.
pub struct StageCompleter {
    pub(super) chain: Weak<InitializationChain>,
    pub(super) scheduler: SchedulerHandle,
    pub(super) cycle: u64,
    pub(super) index: usize,
    pub(super) stage: StageId,
}

impl StageCompleter {
    pub fn stage(&self) -> &StageId {
        &self.stage
    }

    /// Report the stage's async result. Safe to call from any thread.
    pub fn complete(self, result: Result<(), RadioError>) {
        let Self {
            chain,
            scheduler,
            cycle,
            index,
            stage,
        } = self;

        let scheduled = scheduler.schedule(move || match chain.upgrade() {
            Some(chain) => chain.on_stage_complete(cycle, index, result),
            None => tracing::debug!(stage = %stage, "Chain dropped before stage completion"),
        });

        if let Err(e) = scheduled {
            tracing::warn!(cycle, index, "Dropping stage completion: {}", e);
        }
    }

    pub fn into_completion(self) -> Completion {
        Box::new(move |result| self.complete(result))
    }
}
