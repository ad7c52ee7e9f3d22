//! Test doubles for bleproc integration tests.

pub mod radio;
pub mod stage;

pub use radio::{Behavior, FakeRadio, Op, RadioCall, SecurityEvent};
pub use stage::{RecordingStage, StageBehavior, StageLog};

use bleproc::{BleProcess, EventScheduler, InitializationChain, Outcome};
use parking_lot::Mutex;
use std::sync::Arc;

/// Scheduler, fake radio and process wired together, with outcomes captured.
pub struct Harness {
    pub scheduler: EventScheduler,
    pub radio: Arc<FakeRadio>,
    pub process: BleProcess,
    outcomes: Arc<Mutex<Vec<Outcome>>>,
}

impl Harness {
    pub fn new(chain: InitializationChain) -> Self {
        Self::with_radio(FakeRadio::new(), chain)
    }

    pub fn with_radio(radio: Arc<FakeRadio>, chain: InitializationChain) -> Self {
        let scheduler = EventScheduler::new();
        let process = BleProcess::new(scheduler.handle(), radio.clone(), chain);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        process.on_ready(move |outcome| sink.lock().push(outcome.clone()));

        Self {
            scheduler,
            radio,
            process,
            outcomes,
        }
    }

    /// Drain the scheduler; returns the number of work items run.
    pub fn run(&mut self) -> usize {
        self.scheduler.run_until_idle()
    }

    /// Every outcome delivered so far, oldest first.
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }
}

/// Install a debug-level subscriber that writes through the test harness.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
