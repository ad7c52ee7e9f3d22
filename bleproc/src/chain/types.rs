//! Type definitions for the initialization chain.

use super::context::StageContext;
use bleproc_shared::errors::{BleError, RadioError, StageFailure};
use bleproc_shared::radio::Feature;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Stable identity of a stage within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageId(Cow<'static, str>);

impl StageId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StageId {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

/// Configuration concern a stage is responsible for.
///
/// Used to check structural dependencies when the chain is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Security,
    Privacy,
    /// Innermost stage that declares readiness.
    Base,
    /// Application-provided stage.
    Custom,
}

/// Progress of a single stage within one `start()` cycle.
///
/// ```text
/// Idle → Configuring → Succeeded
///                    → Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    /// Not reached in the current cycle.
    Idle,
    /// `begin()` ran; waiting for the stage's own async work.
    Configuring,
    /// Stage finished; the next stage has been invoked.
    Succeeded,
    /// Stage failed; the chain was aborted.
    Failed,
}

impl StageState {
    pub fn can_transition_to(&self, target: StageState) -> bool {
        use StageState::*;
        matches!(
            (self, target),
            (Idle, Configuring) | (Configuring, Succeeded) | (Configuring, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Idle => "idle",
            StageState::Configuring => "configuring",
            StageState::Succeeded => "succeeded",
            StageState::Failed => "failed",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage reports when `begin()` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// All work finished synchronously; advance now.
    Done,
    /// The completer was handed to an async radio call; advance when it fires.
    Pending,
}

/// Error returned from [`Stage::begin`] or carried by a failed completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("{0}")]
    Failed(#[from] StageFailure),

    #[error("unsupported capability: {0}")]
    Unsupported(Feature),
}

impl StageError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        StageError::Failed(StageFailure::InvalidConfig(msg.into()))
    }

    /// Attribute this error to `stage` for the application.
    pub fn into_ble_error(self, stage: &StageId) -> BleError {
        match self {
            StageError::Failed(reason) => BleError::StageConfigurationFailed {
                stage: stage.to_string(),
                reason,
            },
            StageError::Unsupported(feature) => BleError::UnsupportedCapability {
                stage: stage.to_string(),
                feature,
            },
        }
    }
}

impl From<RadioError> for StageError {
    fn from(err: RadioError) -> Self {
        StageError::Failed(StageFailure::Radio(err))
    }
}

/// One unit of the initialization chain.
///
/// A stage configures one subsystem of the radio stack. The chain calls
/// `begin` at most once per cycle, only after every earlier stage succeeded.
/// A stage returning [`Progress::Pending`] must have handed its completer
/// (see [`StageContext::into_completion`]) to exactly one async radio call;
/// otherwise the chain stalls.
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    fn kind(&self) -> StageKind {
        StageKind::Custom
    }

    /// Kinds that must appear earlier in the chain.
    fn requires(&self) -> &[StageKind] {
        &[]
    }

    fn begin(&self, cx: StageContext) -> Result<Progress, StageError>;
}
