//! Configuration for a BLE process.

use bleproc_shared::errors::{BleError, BleResult, StageFailure};
use bleproc_shared::radio::{IoCapability, Passkey, SecurityParams};
use serde::{Deserialize, Serialize};

pub use bleproc_shared::radio::{PrivacyConfig, ResolutionStrategy};

// ============================================================================
// Security Configuration
// ============================================================================

/// Security manager settings for the security stage.
///
/// Values are stored as given and validated only when the security stage
/// runs, so an invalid passkey surfaces as a stage failure, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Store bonding information so peers can reconnect without pairing.
    ///
    /// Default: false
    #[serde(default = "default_enable_bonding")]
    pub enable_bonding: bool,

    /// Require man-in-the-middle protection during pairing.
    ///
    /// Needs an I/O capability other than `no_input_no_output`.
    /// Default: false
    #[serde(default = "default_require_mitm")]
    pub require_mitm: bool,

    /// I/O capabilities advertised to peers.
    ///
    /// Default: no_input_no_output
    #[serde(default)]
    pub io_capability: IoCapability,

    /// Fixed six-digit passkey.
    ///
    /// - None: the stack generates passkeys
    /// - Some(digits): exactly six decimal digits, needs a display-capable I/O capability
    #[serde(default)]
    pub passkey: Option<String>,

    /// Enable data signing.
    ///
    /// Default: false
    #[serde(default = "default_enable_signing")]
    pub enable_signing: bool,

    /// Location of the persistent bonding database, passed to the stack as is.
    ///
    /// When set together with bonding, bonding state survives a reset.
    #[serde(default)]
    pub db_path: Option<String>,
}

fn default_enable_bonding() -> bool {
    false
}

fn default_require_mitm() -> bool {
    false
}

fn default_enable_signing() -> bool {
    false
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_bonding: default_enable_bonding(),
            require_mitm: default_require_mitm(),
            io_capability: IoCapability::default(),
            passkey: None,
            enable_signing: default_enable_signing(),
            db_path: None,
        }
    }
}

impl SecurityConfig {
    /// Create a builder for custom security settings.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SecurityConfig::builder()
    ///     .enable_bonding(true)
    ///     .io_capability(IoCapability::DisplayOnly)
    ///     .passkey("123456")
    ///     .build();
    /// ```
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::new()
    }

    /// Validate and convert into parameters for the radio stack.
    pub fn to_params(&self) -> Result<SecurityParams, StageFailure> {
        let passkey = self
            .passkey
            .as_deref()
            .map(Passkey::parse)
            .transpose()
            .map_err(StageFailure::InvalidConfig)?;

        if self.require_mitm && !self.io_capability.has_user_interaction() {
            return Err(StageFailure::InvalidConfig(
                "MITM protection requires an I/O capability other than no_input_no_output"
                    .to_string(),
            ));
        }

        if passkey.is_some() && !self.io_capability.can_display() {
            return Err(StageFailure::InvalidConfig(format!(
                "a fixed passkey requires a display-capable I/O capability, got {:?}",
                self.io_capability
            )));
        }

        Ok(SecurityParams {
            enable_bonding: self.enable_bonding,
            require_mitm: self.require_mitm,
            io_capability: self.io_capability,
            passkey,
            enable_signing: self.enable_signing,
            db_path: self.db_path.clone(),
        })
    }

    /// Whether bonding state should be preserved across resets.
    pub fn preserves_bonding(&self) -> bool {
        self.enable_bonding && self.db_path.is_some()
    }
}

/// Builder for [`SecurityConfig`].
#[derive(Debug, Clone, Default)]
pub struct SecurityConfigBuilder {
    inner: SecurityConfig,
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_bonding(&mut self, enabled: bool) -> &mut Self {
        self.inner.enable_bonding = enabled;
        self
    }

    pub fn require_mitm(&mut self, required: bool) -> &mut Self {
        self.inner.require_mitm = required;
        self
    }

    pub fn io_capability(&mut self, capability: IoCapability) -> &mut Self {
        self.inner.io_capability = capability;
        self
    }

    pub fn passkey(&mut self, digits: impl Into<String>) -> &mut Self {
        self.inner.passkey = Some(digits.into());
        self
    }

    pub fn enable_signing(&mut self, enabled: bool) -> &mut Self {
        self.inner.enable_signing = enabled;
        self
    }

    pub fn db_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.inner.db_path = Some(path.into());
        self
    }

    pub fn build(&self) -> SecurityConfig {
        self.inner.clone()
    }
}

// ============================================================================
// Process Options
// ============================================================================

/// Which optional stages a process runs, and how they are configured.
///
/// The base stage is always present. Enabling privacy without security
/// adds a security stage with default settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleProcessOptions {
    /// Security manager stage.
    #[serde(default)]
    pub security: Option<SecurityConfig>,

    /// Privacy stage.
    #[serde(default)]
    pub privacy: Option<PrivacyConfig>,
}

impl BleProcessOptions {
    /// Parse options from JSON.
    pub fn from_json(json: &str) -> BleResult<Self> {
        serde_json::from_str(json).map_err(|e| BleError::Config(format!("invalid options: {}", e)))
    }

    /// Security settings the chain will run with, if any.
    pub fn effective_security(&self) -> Option<SecurityConfig> {
        match (&self.security, &self.privacy) {
            (Some(security), _) => Some(security.clone()),
            (None, Some(_)) => Some(SecurityConfig::default()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_config_defaults() {
        let config = SecurityConfig::default();
        assert!(!config.enable_bonding, "bonding should default to false");
        assert!(!config.require_mitm, "MITM should default to false");
        assert!(!config.enable_signing, "signing should default to false");
        assert_eq!(config.io_capability, IoCapability::NoInputNoOutput);
        assert!(config.passkey.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_security_config_serde_defaults() {
        let config: SecurityConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SecurityConfig::default());
    }

    #[test]
    fn test_security_config_serde_explicit_values() {
        let json = r#"{
            "enable_bonding": true,
            "require_mitm": true,
            "io_capability": "keyboard_display",
            "passkey": "246810",
            "db_path": "/flash/bonds"
        }"#;
        let config: SecurityConfig = serde_json::from_str(json).unwrap();
        assert!(config.enable_bonding);
        assert!(config.require_mitm);
        assert_eq!(config.io_capability, IoCapability::KeyboardDisplay);
        assert_eq!(config.passkey.as_deref(), Some("246810"));
        assert_eq!(config.db_path.as_deref(), Some("/flash/bonds"));
        assert!(config.preserves_bonding());
    }

    #[test]
    fn test_to_params_valid() {
        let config = SecurityConfig::builder()
            .enable_bonding(true)
            .io_capability(IoCapability::DisplayYesNo)
            .require_mitm(true)
            .passkey("000042")
            .build();

        let params = config.to_params().unwrap();
        assert!(params.enable_bonding);
        assert!(params.require_mitm);
        assert_eq!(params.passkey.map(|p| p.value()), Some(42));
    }

    #[test]
    fn test_to_params_rejects_bad_passkey() {
        let config = SecurityConfig::builder()
            .io_capability(IoCapability::DisplayOnly)
            .passkey("12345")
            .build();
        assert!(matches!(
            config.to_params(),
            Err(StageFailure::InvalidConfig(msg)) if msg.contains("6 digits")
        ));
    }

    #[test]
    fn test_to_params_rejects_mitm_without_io() {
        let config = SecurityConfig::builder().require_mitm(true).build();
        assert!(matches!(
            config.to_params(),
            Err(StageFailure::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_to_params_rejects_passkey_without_display() {
        let config = SecurityConfig::builder()
            .io_capability(IoCapability::KeyboardOnly)
            .passkey("123456")
            .build();
        assert!(matches!(
            config.to_params(),
            Err(StageFailure::InvalidConfig(msg)) if msg.contains("display")
        ));
    }

    #[test]
    fn test_preserves_bonding_needs_both() {
        assert!(!SecurityConfig::builder().enable_bonding(true).build().preserves_bonding());
        assert!(!SecurityConfig::builder().db_path("/db").build().preserves_bonding());
    }

    #[test]
    fn test_process_options_from_json() {
        let opts = BleProcessOptions::from_json("{}").unwrap();
        assert_eq!(opts, BleProcessOptions::default());
        assert!(opts.effective_security().is_none());

        let opts = BleProcessOptions::from_json(r#"{"privacy": {}}"#).unwrap();
        assert_eq!(opts.privacy, Some(PrivacyConfig::default()));
        assert_eq!(opts.effective_security(), Some(SecurityConfig::default()));

        let err = BleProcessOptions::from_json(r#"{"security": 5}"#).unwrap_err();
        assert!(matches!(err, BleError::Config(_)));
    }
}
