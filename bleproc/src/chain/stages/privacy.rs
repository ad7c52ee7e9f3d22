//! Privacy stage.

use crate::chain::{Progress, Stage, StageContext, StageError, StageId, StageKind};
use bleproc_shared::constants::stages as stage_names;
use bleproc_shared::radio::{Feature, PrivacyConfig};

/// Applies the peripheral privacy configuration, then enables privacy.
///
/// Needs a security stage earlier in the chain.
#[derive(Debug, Clone)]
pub struct PrivacyStage {
    config: PrivacyConfig,
}

impl PrivacyStage {
    pub fn new(config: PrivacyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }
}

impl Stage for PrivacyStage {
    fn id(&self) -> StageId {
        StageId::from(stage_names::PRIVACY)
    }

    fn kind(&self) -> StageKind {
        StageKind::Privacy
    }

    fn requires(&self) -> &[StageKind] {
        &[StageKind::Security]
    }

    fn begin(&self, cx: StageContext) -> Result<Progress, StageError> {
        let radio = cx.radio().clone();
        if !radio.is_feature_supported(Feature::Privacy) {
            return Err(StageError::Unsupported(Feature::Privacy));
        }

        radio.set_peripheral_privacy_configuration(&self.config)?;
        tracing::debug!(
            resolution = ?self.config.resolution_strategy,
            non_resolvable = self.config.use_non_resolvable_random_address,
            "Applied peripheral privacy configuration"
        );

        radio.enable_privacy(cx.into_completion())?;
        Ok(Progress::Pending)
    }
}
