//! Error types for the BLE process.
//!
//! Errors are split by origin:
//! - [`RadioError`]: status codes reported by the radio stack itself
//! - [`StageFailure`]: why a single stage could not configure its subsystem
//! - [`BleError`]: what the application sees from `start()` or the ready callback

use crate::radio::Feature;
use thiserror::Error;

// ============================================================================
// Radio Stack Errors
// ============================================================================

/// Status code returned by the radio stack, synchronously or in a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RadioError {
    /// A parameter was rejected by the stack.
    #[error("invalid parameter")]
    InvalidParam,

    /// The stack refused the operation in its current state.
    #[error("operation not permitted")]
    OperationNotPermitted,

    /// The stack has not finished initializing.
    #[error("initialization incomplete")]
    InitializationIncomplete,

    /// The operation is not implemented by this stack.
    #[error("not implemented")]
    NotImplemented,

    /// The stack ran out of memory.
    #[error("out of memory")]
    NoMemory,

    /// Internal failure inside the stack or controller.
    #[error("internal stack failure")]
    InternalStackFailure,

    /// Vendor-specific status code.
    #[error("unspecified error (code {0:#06x})")]
    Unspecified(u16),
}

// ============================================================================
// Stage Failures
// ============================================================================

/// Reason a stage failed to configure its subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    /// A radio call made by the stage failed (sync return or async payload).
    #[error("radio: {0}")]
    Radio(#[from] RadioError),

    /// The stage's configuration was rejected when the stage ran.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Errors surfaced to the application.
///
/// Every variant except `Radio`, `Config` and `SchedulerStopped` is delivered
/// through the ready callback and ends the current `start()` cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BleError {
    /// `start()` was called while the radio is initialized or a cycle is in flight.
    #[error("radio stack already initialized")]
    AlreadyInitialized,

    /// The radio stack reported an error in its init completion.
    #[error("hardware initialization failed: {0}")]
    HardwareInitFailed(RadioError),

    /// A stage's own setup call failed.
    #[error("stage '{stage}' failed: {reason}")]
    StageConfigurationFailed { stage: String, reason: StageFailure },

    /// A stage needs a capability the radio does not report as supported.
    #[error("stage '{stage}' requires unsupported capability: {feature}")]
    UnsupportedCapability { stage: String, feature: Feature },

    /// The synchronous part of a radio call made by `start()` failed.
    #[error("radio: {0}")]
    Radio(#[from] RadioError),

    /// The chain or the options could not be built.
    #[error("config: {0}")]
    Config(String),

    /// Work could not be queued because the event scheduler is gone.
    #[error("event scheduler has stopped")]
    SchedulerStopped,
}

impl BleError {
    /// Name of the stage that produced this error, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            BleError::StageConfigurationFailed { stage, .. }
            | BleError::UnsupportedCapability { stage, .. } => Some(stage.as_str()),
            _ => None,
        }
    }
}

/// Result alias used throughout bleproc.
pub type BleResult<T> = Result<T, BleError>;
