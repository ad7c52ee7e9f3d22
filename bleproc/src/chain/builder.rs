//! Chain construction.

use super::InitializationChain;
use super::stages::{BaseStage, PrivacyStage, SecurityStage};
use super::types::{Stage, StageKind};
use crate::options::{BleProcessOptions, PrivacyConfig, SecurityConfig};
use bleproc_shared::errors::{BleError, BleResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Assembles an [`InitializationChain`] in execution order.
///
/// Stages run in the order they are added. The base stage is appended by
/// [`build`](Self::build) and always runs last.
#[derive(Default)]
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the stages `options` enables.
    ///
    /// Privacy without security gets a default security stage in front of it.
    pub fn from_options(options: &BleProcessOptions) -> Self {
        let mut builder = Self::new();
        if let Some(security) = options.effective_security() {
            builder = builder.with_security(security);
        }
        if let Some(privacy) = &options.privacy {
            builder = builder.with_privacy(privacy.clone());
        }
        builder
    }

    /// Append an arbitrary stage.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn with_security(self, config: SecurityConfig) -> Self {
        self.stage(SecurityStage::new(config))
    }

    pub fn with_privacy(self, config: PrivacyConfig) -> Self {
        self.stage(PrivacyStage::new(config))
    }

    /// Validate the structure and freeze the chain.
    pub fn build(self) -> BleResult<InitializationChain> {
        let mut stages = self.stages;
        let mut seen_ids = HashSet::new();
        let mut seen_kinds = HashSet::new();

        for stage in &stages {
            let id = stage.id();
            if stage.kind() == StageKind::Base {
                return Err(BleError::Config(format!(
                    "stage '{}' is a base stage; the base stage is added automatically",
                    id
                )));
            }
            if let Some(missing) = stage.requires().iter().find(|k| !seen_kinds.contains(*k)) {
                return Err(BleError::Config(format!(
                    "stage '{}' requires a {:?} stage earlier in the chain",
                    id, missing
                )));
            }
            if !seen_ids.insert(id.clone()) {
                return Err(BleError::Config(format!("duplicate stage '{}'", id)));
            }
            seen_kinds.insert(stage.kind());
        }

        let base: Arc<dyn Stage> = Arc::new(BaseStage);
        if seen_ids.contains(&base.id()) {
            return Err(BleError::Config(format!(
                "stage id '{}' is reserved",
                base.id()
            )));
        }
        stages.push(base);

        let chain = InitializationChain::new(stages);
        let order: Vec<String> = chain.stage_ids().iter().map(|s| s.to_string()).collect();
        tracing::debug!(stages = ?order, "Built initialization chain");
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Progress, StageContext, StageError, StageId};
    use bleproc_shared::constants::stages as stage_names;

    struct Named(&'static str);

    impl Stage for Named {
        fn id(&self) -> StageId {
            StageId::from(self.0)
        }

        fn begin(&self, _cx: StageContext) -> Result<Progress, StageError> {
            Ok(Progress::Done)
        }
    }

    fn ids(chain: &InitializationChain) -> Vec<String> {
        chain.stage_ids().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_builder_has_base_only() {
        let chain = ChainBuilder::new().build().unwrap();
        assert_eq!(ids(&chain), vec![stage_names::BASE]);
    }

    #[test]
    fn test_order_follows_construction() {
        let chain = ChainBuilder::new()
            .with_security(SecurityConfig::default())
            .with_privacy(PrivacyConfig::default())
            .stage(Named("custom"))
            .build()
            .unwrap();
        assert_eq!(
            ids(&chain),
            vec![
                stage_names::SECURITY,
                stage_names::PRIVACY,
                "custom",
                stage_names::BASE
            ]
        );
    }

    #[test]
    fn test_privacy_requires_security_first() {
        let err = ChainBuilder::new()
            .with_privacy(PrivacyConfig::default())
            .with_security(SecurityConfig::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BleError::Config(msg) if msg.contains("privacy")));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = ChainBuilder::new()
            .stage(Named("dup"))
            .stage(Named("dup"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BleError::Config(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_user_base_stage_rejected() {
        assert!(ChainBuilder::new().stage(BaseStage).build().is_err());
        assert!(ChainBuilder::new().stage(Named("base")).build().is_err());
    }

    #[test]
    fn test_from_options_privacy_implies_security() {
        let options = BleProcessOptions {
            security: None,
            privacy: Some(PrivacyConfig::default()),
        };
        let chain = ChainBuilder::from_options(&options).build().unwrap();
        assert_eq!(
            ids(&chain),
            vec![stage_names::SECURITY, stage_names::PRIVACY, stage_names::BASE]
        );

        let chain = ChainBuilder::from_options(&BleProcessOptions::default())
            .build()
            .unwrap();
        assert_eq!(chain.len(), 1);
    }
}
