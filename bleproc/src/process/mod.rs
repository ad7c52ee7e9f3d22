//! BLE process controller.
//!
//! [`BleProcess`] owns the initialization chain and bridges radio lifecycle
//! events into work on the [`EventScheduler`](crate::scheduler::EventScheduler).
//!
//! ```text
//! start() ──→ radio.initialize() ──(any thread)──→ completion
//!                                                     │ schedule
//!                                                     ▼
//!                          scheduler: on_hardware_init ──→ chain.begin()
//!                                                              │
//!                                  on_ready(outcome) ←─────────┘
//! ```

mod lifecycle;
mod state;

pub use state::ProcessState;

use crate::chain::{ChainBuilder, InitializationChain};
use crate::metrics::{ProcessMetrics, ProcessMetricsStorage};
use crate::options::BleProcessOptions;
use crate::scheduler::SchedulerHandle;
use bleproc_shared::errors::BleResult;
use bleproc_shared::radio::RadioStack;
use parking_lot::Mutex;
use std::sync::Arc;

/// Terminal result of one `start()` cycle.
pub type Outcome = BleResult<()>;

type ReadyCallback = Box<dyn FnMut(&Outcome) + Send + 'static>;

/// Status plus the number of the current cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessStatus {
    pub(crate) state: ProcessState,
    pub(crate) cycle: u64,
}

/// State shared between the controller and the work items it schedules.
///
/// Scheduled work and radio callbacks hold this weakly.
pub(crate) struct ProcessShared {
    pub(crate) radio: Arc<dyn RadioStack>,
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) chain: Arc<InitializationChain>,
    pub(crate) status: Mutex<ProcessStatus>,
    pub(crate) on_ready: Mutex<Option<ReadyCallback>>,
    pub(crate) metrics: ProcessMetricsStorage,
}

/// Drives a radio stack from uninitialized to ready.
///
/// All chain and controller logic runs on the scheduler that `scheduler`
/// belongs to; the application must keep that scheduler running.
///
/// # Example
///
/// ```ignore
/// let mut scheduler = EventScheduler::new();
/// let process = BleProcess::from_options(scheduler.handle(), radio, &options)?;
/// process.on_ready(|outcome| match outcome {
///     Ok(()) => tracing::info!("radio ready"),
///     Err(e) => tracing::error!("radio failed: {}", e),
/// });
/// process.start()?;
/// scheduler.run_forever().await;
/// ```
pub struct BleProcess {
    shared: Arc<ProcessShared>,
}

impl BleProcess {
    pub fn new(
        scheduler: SchedulerHandle,
        radio: Arc<dyn RadioStack>,
        chain: InitializationChain,
    ) -> Self {
        let metrics = chain.metrics.clone();
        Self {
            shared: Arc::new(ProcessShared {
                radio,
                scheduler,
                chain: Arc::new(chain),
                status: Mutex::new(ProcessStatus {
                    state: ProcessState::Uninitialized,
                    cycle: 0,
                }),
                on_ready: Mutex::new(None),
                metrics,
            }),
        }
    }

    /// Build the chain `options` describe and wrap it in a process.
    pub fn from_options(
        scheduler: SchedulerHandle,
        radio: Arc<dyn RadioStack>,
        options: &BleProcessOptions,
    ) -> BleResult<Self> {
        let chain = ChainBuilder::from_options(options).build()?;
        Ok(Self::new(scheduler, radio, chain))
    }

    /// Begin bringing the radio up. Returns as soon as `initialize()` is issued.
    ///
    /// Fails with `AlreadyInitialized`, without touching the radio, if a cycle
    /// is in flight or finished without `stop()`, or if the radio already
    /// reports initialized. A synchronous `initialize()` failure is returned
    /// here and the ready callback is not invoked.
    pub fn start(&self) -> BleResult<()> {
        lifecycle::start(&self.shared)
    }

    /// Abandon the current cycle and shut the radio down if it is up.
    ///
    /// Safe to call from any state, any number of times.
    pub fn stop(&self) {
        lifecycle::stop(&self.shared)
    }

    /// Register the callback that receives each cycle's outcome.
    ///
    /// Replaces any earlier callback. Runs on the scheduler thread.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnMut(&Outcome) + Send + 'static,
    {
        *self.shared.on_ready.lock() = Some(Box::new(callback));
    }

    pub fn state(&self) -> ProcessState {
        self.shared.status.lock().state
    }

    /// Number of the most recent cycle (0 before the first `start()`).
    pub fn cycle(&self) -> u64 {
        self.shared.status.lock().cycle
    }

    pub fn chain(&self) -> &Arc<InitializationChain> {
        &self.shared.chain
    }

    pub fn metrics(&self) -> ProcessMetrics {
        ProcessMetrics::new(self.shared.metrics.clone())
    }
}

impl Drop for BleProcess {
    fn drop(&mut self) {
        tracing::debug!(state = %self.state(), "BleProcess dropped");
        lifecycle::stop(&self.shared);
    }
}
