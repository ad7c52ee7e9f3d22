//! bleproc - staged BLE radio initialization
//!
//! Brings a radio stack from uninitialized to ready through an ordered chain
//! of configuration stages (security, privacy, base), driven by a
//! single-threaded event scheduler.

pub mod chain;
pub mod metrics;
pub mod options;
pub mod process;
pub mod scheduler;
pub mod util;

pub use chain::{
    ChainBuilder, InitializationChain, Progress, Stage, StageCompleter, StageContext, StageError,
    StageId, StageKind, StageState,
};
pub use metrics::{ProcessMetrics, ProcessMetricsStorage};
pub use options::{BleProcessOptions, SecurityConfig, SecurityConfigBuilder};
pub use process::{BleProcess, Outcome, ProcessState};
pub use scheduler::{EventScheduler, SchedulerHandle, WorkItem};

pub use bleproc_shared::{
    BleError, BleResult, Completion, ConnectionHandle, EventNotifier, Feature, IoCapability,
    Passkey, PrivacyConfig, RadioError, RadioStack, ResolutionStrategy, SecurityEventHandler,
    SecurityParams, StageFailure,
};
