//! Process lifecycle status and state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`BleProcess`](super::BleProcess).
///
/// ```text
/// start()            → HardwareInitPending
/// init completion Ok → StageChainRunning → Ready | Failed
/// init completion Err→ Failed
/// stop()             → Uninitialized (from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Nothing issued to the radio, or stopped.
    Uninitialized,

    /// `initialize()` issued, waiting for the hardware completion.
    HardwareInitPending,

    /// Hardware is up; stages are running.
    StageChainRunning,

    /// Every stage succeeded and the ready callback ran with `Ok`.
    Ready,

    /// The cycle ended with an error. Call `stop()` before starting again.
    Failed,
}

impl ProcessState {
    /// Check if start() can be called from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, ProcessState::Uninitialized)
    }

    /// A cycle is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ProcessState::HardwareInitPending | ProcessState::StageChainRunning
        )
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, target),
            // stop() is valid from anywhere
            (_, Uninitialized) |
            (Uninitialized, HardwareInitPending) |
            (HardwareInitPending, StageChainRunning) |
            (HardwareInitPending, Failed) |
            (StageChainRunning, Ready) |
            (StageChainRunning, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Uninitialized => "uninitialized",
            ProcessState::HardwareInitPending => "hardware_init_pending",
            ProcessState::StageChainRunning => "stage_chain_running",
            ProcessState::Ready => "ready",
            ProcessState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
