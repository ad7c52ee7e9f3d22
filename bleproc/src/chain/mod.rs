//! Radio initialization chain.
//!
//! ## Architecture
//!
//! Stages run strictly one after another, in the order they were added to
//! [`ChainBuilder`]. The base stage is always last:
//!
//! ```text
//! hardware ready ──→ Security ──→ Privacy ──→ Base ──→ Ok(())
//!                       │            │
//!                       └── error ───┴──────────────→ Err(stage, reason)
//! ```
//!
//! A stage either finishes inside `begin()` ([`Progress::Done`]) or hands its
//! completer to an async radio call ([`Progress::Pending`]). Completions are
//! queued on the scheduler and carry the cycle number, so anything arriving
//! after `stop()` or after the stage already ended is ignored.

mod builder;
mod context;
pub mod stages;
mod types;

pub use builder::ChainBuilder;
pub use context::{StageCompleter, StageContext};
pub use types::{Progress, Stage, StageError, StageId, StageKind, StageState};

use crate::metrics::ProcessMetricsStorage;
use crate::scheduler::SchedulerHandle;
use bleproc_shared::errors::{BleResult, RadioError};
use bleproc_shared::radio::RadioStack;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives the terminal outcome of a cycle: `(cycle, outcome)`.
pub(crate) type OutcomeSink = Arc<dyn Fn(u64, BleResult<()>) + Send + Sync>;

/// Collaborators a running cycle needs.
#[derive(Clone)]
pub(crate) struct ChainEnv {
    pub(crate) radio: Arc<dyn RadioStack>,
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) on_outcome: OutcomeSink,
}

/// Mutable progress of the current cycle.
struct ChainRun {
    cycle: u64,
    states: Vec<StageState>,
    /// Present while the cycle is live; taken when it ends or is abandoned.
    env: Option<ChainEnv>,
}

/// Ordered, immutable sequence of stages plus the progress of the current cycle.
pub struct InitializationChain {
    stages: Vec<Arc<dyn Stage>>,
    run: Mutex<ChainRun>,
    pub(crate) metrics: ProcessMetricsStorage,
}

impl InitializationChain {
    pub(crate) fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        let states = vec![StageState::Idle; stages.len()];
        Self {
            stages,
            run: Mutex::new(ChainRun {
                cycle: 0,
                states,
                env: None,
            }),
            metrics: ProcessMetricsStorage::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage identities in execution order.
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Progress of every stage in the current (or last) cycle.
    pub fn stage_states(&self) -> Vec<(StageId, StageState)> {
        let run = self.run.lock();
        self.stages
            .iter()
            .zip(run.states.iter())
            .map(|(stage, state)| (stage.id(), *state))
            .collect()
    }

    /// Whether a cycle is in flight.
    pub fn is_running(&self) -> bool {
        self.run.lock().env.is_some()
    }

    /// Begin a new cycle at the first stage.
    pub(crate) fn begin(self: &Arc<Self>, cycle: u64, env: ChainEnv) {
        {
            let mut run = self.run.lock();
            run.cycle = cycle;
            run.states = vec![StageState::Idle; self.stages.len()];
            run.env = Some(env);
        }

        tracing::debug!(cycle, stages = self.stages.len(), "Starting stage chain");
        self.begin_stage(cycle, 0);
    }

    /// Forget the current cycle; late completions become stale.
    pub(crate) fn abandon(&self) {
        let mut run = self.run.lock();
        if run.env.take().is_some() {
            tracing::debug!(cycle = run.cycle, "Abandoned stage chain");
        }
    }

    fn begin_stage(self: &Arc<Self>, cycle: u64, index: usize) {
        let Some(stage) = self.stages.get(index) else {
            return;
        };
        let id = stage.id();

        let env = {
            let mut run = self.run.lock();
            if run.cycle != cycle {
                return;
            }
            let Some(env) = run.env.clone() else {
                return;
            };
            if !run.states[index].can_transition_to(StageState::Configuring) {
                tracing::warn!(stage = %id, state = %run.states[index], "Stage already ran this cycle");
                return;
            }
            run.states[index] = StageState::Configuring;
            env
        };

        tracing::info!(stage = %id, cycle, "Beginning stage");

        let completer = StageCompleter {
            chain: Arc::downgrade(self),
            scheduler: env.scheduler,
            cycle,
            index,
            stage: id.clone(),
        };
        let cx = StageContext::new(env.radio, completer);

        match stage.begin(cx) {
            Ok(Progress::Done) => self.advance(cycle, index),
            Ok(Progress::Pending) => {
                tracing::debug!(stage = %id, "Stage waiting for radio completion");
            }
            Err(e) => self.fail(cycle, index, e),
        }
    }

    /// Entry point for scheduled completions.
    pub(crate) fn on_stage_complete(
        self: &Arc<Self>,
        cycle: u64,
        index: usize,
        result: Result<(), RadioError>,
    ) {
        if !self.is_configuring(cycle, index) {
            ProcessMetricsStorage::incr(&self.metrics.stale_callbacks);
            tracing::debug!(cycle, index, "Ignoring stale stage completion");
            return;
        }

        match result {
            Ok(()) => self.advance(cycle, index),
            Err(e) => self.fail(cycle, index, e.into()),
        }
    }

    fn is_configuring(&self, cycle: u64, index: usize) -> bool {
        let run = self.run.lock();
        run.cycle == cycle
            && run.env.is_some()
            && run.states.get(index) == Some(&StageState::Configuring)
    }

    fn advance(self: &Arc<Self>, cycle: u64, index: usize) {
        let finished = {
            let mut run = self.run.lock();
            if run.cycle != cycle || run.env.is_none() {
                return;
            }
            if !run.states[index].can_transition_to(StageState::Succeeded) {
                return;
            }
            run.states[index] = StageState::Succeeded;

            if index + 1 == self.stages.len() {
                run.env.take()
            } else {
                None
            }
        };

        ProcessMetricsStorage::incr(&self.metrics.stages_completed);
        tracing::info!(stage = %self.stages[index].id(), cycle, "Stage complete");

        match finished {
            Some(env) => (env.on_outcome)(cycle, Ok(())),
            None => self.begin_stage(cycle, index + 1),
        }
    }

    fn fail(&self, cycle: u64, index: usize, err: StageError) {
        let env = {
            let mut run = self.run.lock();
            if run.cycle != cycle {
                return;
            }
            if !run.states[index].can_transition_to(StageState::Failed) {
                return;
            }
            run.states[index] = StageState::Failed;
            run.env.take()
        };
        let Some(env) = env else {
            return;
        };

        let id = self.stages[index].id();
        tracing::error!(stage = %id, cycle, "Stage failed: {}", err);
        (env.on_outcome)(cycle, Err(err.into_ble_error(&id)));
    }
}
