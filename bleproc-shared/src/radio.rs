//! Radio stack contract.
//!
//! The process core never talks to hardware directly. Everything it needs is
//! expressed by [`RadioStack`]. Implementations may invoke completions and
//! the event notifier from any thread; the core only ever reacts to them by
//! queueing work on its own scheduler.

use crate::constants::security::PASSKEY_LENGTH;
use crate::errors::RadioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Continuation invoked once when an asynchronous radio call resolves.
pub type Completion = Box<dyn FnOnce(Result<(), RadioError>) + Send + 'static>;

/// Callback the stack fires when it has events waiting for `process_events()`.
pub type EventNotifier = Arc<dyn Fn() + Send + Sync + 'static>;

// ============================================================================
// Capabilities
// ============================================================================

/// Optional radio stack capabilities queried before stages issue calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Security manager (pairing, bonding, encryption).
    Security,
    /// Data signing.
    Signing,
    /// LE privacy (resolvable private addresses).
    Privacy,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Security => "security",
            Feature::Signing => "signing",
            Feature::Privacy => "privacy",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Security Parameters
// ============================================================================

/// I/O capabilities advertised during pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    #[default]
    NoInputNoOutput,
    KeyboardDisplay,
}

impl IoCapability {
    /// Whether the device can show a passkey to the user.
    pub fn can_display(&self) -> bool {
        matches!(
            self,
            IoCapability::DisplayOnly | IoCapability::DisplayYesNo | IoCapability::KeyboardDisplay
        )
    }

    /// Whether any user interaction is possible (required for MITM protection).
    pub fn has_user_interaction(&self) -> bool {
        !matches!(self, IoCapability::NoInputNoOutput)
    }
}

/// Static six-digit passkey.
///
/// Digits are stored as ASCII. `Debug` does not reveal them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Passkey([u8; PASSKEY_LENGTH]);

impl Passkey {
    /// Parse a passkey from exactly six decimal digits.
    pub fn parse(s: &str) -> Result<Self, String> {
        let bytes = s.as_bytes();
        if bytes.len() != PASSKEY_LENGTH {
            return Err(format!(
                "passkey must be {} digits, got {}",
                PASSKEY_LENGTH,
                bytes.len()
            ));
        }
        if !bytes.iter().all(u8::is_ascii_digit) {
            return Err("passkey must contain only decimal digits".to_string());
        }
        let mut digits = [0u8; PASSKEY_LENGTH];
        digits.copy_from_slice(bytes);
        Ok(Self(digits))
    }

    pub fn as_bytes(&self) -> &[u8; PASSKEY_LENGTH] {
        &self.0
    }

    /// Numeric value of the passkey (0..=999999).
    pub fn value(&self) -> u32 {
        self.0
            .iter()
            .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'))
    }
}

impl fmt::Debug for Passkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passkey(******)")
    }
}

/// Validated parameters handed to [`RadioStack::init_security`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityParams {
    pub enable_bonding: bool,
    pub require_mitm: bool,
    pub io_capability: IoCapability,
    pub passkey: Option<Passkey>,
    pub enable_signing: bool,
    /// Opaque bonding database location, passed through unmodified.
    pub db_path: Option<String>,
}

/// Handle identifying a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle(pub u16);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// ============================================================================
// Privacy Parameters
// ============================================================================

/// How a peripheral treats peers whose address it cannot resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Do not attempt address resolution.
    DoNotResolve,
    /// Reject pairing requests from unresolved addresses.
    RejectNonResolvedAddress,
    /// Start pairing with unresolved peers.
    #[default]
    PerformPairingProcedure,
    /// Start authentication with unresolved peers.
    PerformAuthenticationProcedure,
}

/// Peripheral privacy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Use non-resolvable random addresses for non-connectable advertising.
    #[serde(default = "default_use_non_resolvable_random_address")]
    pub use_non_resolvable_random_address: bool,

    /// Policy for peers with unresolvable addresses.
    #[serde(default)]
    pub resolution_strategy: ResolutionStrategy,
}

fn default_use_non_resolvable_random_address() -> bool {
    false
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            use_non_resolvable_random_address: default_use_non_resolvable_random_address(),
            resolution_strategy: ResolutionStrategy::default(),
        }
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Long-lived sink for security manager events.
///
/// Events are delivered from inside `RadioStack::process_events()`, so they
/// run on whichever thread drains the stack. Every method has a no-op default.
pub trait SecurityEventHandler: Send + Sync {
    /// Peer asked to pair.
    fn pairing_request(&self, _connection: ConnectionHandle) {}

    /// Passkey must be shown to the user.
    fn passkey_display(&self, _connection: ConnectionHandle, _passkey: Passkey) {}

    /// Pairing finished.
    fn pairing_result(&self, _connection: ConnectionHandle, _result: Result<(), RadioError>) {}

    /// Link encryption state changed.
    fn link_encryption_result(&self, _connection: ConnectionHandle, _encrypted: bool) {}
}

// ============================================================================
// Radio Stack
// ============================================================================

/// Hardware/firmware radio stack being brought online.
///
/// Asynchronous calls return immediately. A synchronous `Err` means the
/// completion will never run; `Ok` means it runs exactly once later.
pub trait RadioStack: Send + Sync {
    /// Whether the stack has completed initialization.
    fn has_initialized(&self) -> bool;

    /// Start asynchronous initialization.
    fn initialize(&self, on_complete: Completion) -> Result<(), RadioError>;

    /// Shut the stack down.
    fn shutdown(&self);

    /// Whether an optional capability is available.
    fn is_feature_supported(&self, feature: Feature) -> bool;

    /// Install or remove the event-pending notifier.
    fn set_event_notifier(&self, notifier: Option<EventNotifier>);

    /// Drain every pending stack event, dispatching to registered handlers.
    fn process_events(&self);

    /// Configure the security manager asynchronously.
    fn init_security(&self, params: &SecurityParams, on_complete: Completion)
    -> Result<(), RadioError>;

    /// Install or remove the security manager event sink.
    fn set_security_event_handler(&self, handler: Option<Arc<dyn SecurityEventHandler>>);

    /// Keep bonding information across resets.
    fn preserve_bonding_state_on_reset(&self, enable: bool) -> Result<(), RadioError>;

    /// Accept a pending pairing request.
    fn accept_pairing_request(&self, connection: ConnectionHandle) -> Result<(), RadioError>;

    /// Apply peripheral privacy settings.
    fn set_peripheral_privacy_configuration(&self, config: &PrivacyConfig)
    -> Result<(), RadioError>;

    /// Enable privacy asynchronously.
    fn enable_privacy(&self, on_complete: Completion) -> Result<(), RadioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passkey_parse() {
        let key = Passkey::parse("012345").unwrap();
        assert_eq!(key.value(), 12345);
        assert_eq!(key.as_bytes(), b"012345");

        assert!(Passkey::parse("12345").is_err());
        assert!(Passkey::parse("1234567").is_err());
        assert!(Passkey::parse("12a456").is_err());
        assert!(Passkey::parse("").is_err());
    }

    #[test]
    fn test_passkey_debug_is_redacted() {
        let key = Passkey::parse("987654").unwrap();
        assert_eq!(format!("{:?}", key), "Passkey(******)");
    }

    #[test]
    fn test_io_capability() {
        assert!(!IoCapability::NoInputNoOutput.has_user_interaction());
        assert!(IoCapability::KeyboardOnly.has_user_interaction());
        assert!(!IoCapability::KeyboardOnly.can_display());
        assert!(IoCapability::DisplayOnly.can_display());
        assert!(IoCapability::KeyboardDisplay.can_display());
        assert_eq!(IoCapability::default(), IoCapability::NoInputNoOutput);
    }

    #[test]
    fn test_privacy_config_serde_defaults() {
        let config: PrivacyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PrivacyConfig::default());
        assert!(!config.use_non_resolvable_random_address);
        assert_eq!(
            config.resolution_strategy,
            ResolutionStrategy::PerformPairingProcedure
        );

        let config: PrivacyConfig =
            serde_json::from_str(r#"{"resolution_strategy": "do_not_resolve"}"#).unwrap();
        assert_eq!(config.resolution_strategy, ResolutionStrategy::DoNotResolve);
    }
}
