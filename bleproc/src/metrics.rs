//! Process-level metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage for process-wide counters.
///
/// Shared between the controller and the chain. All counters are
/// monotonic (never decrease).
#[derive(Clone, Default, Debug)]
pub struct ProcessMetricsStorage {
    /// `start()` calls that issued a radio init
    pub(crate) cycles_started: Arc<AtomicU64>,
    /// Cycles that ended with the ready notification
    pub(crate) cycles_succeeded: Arc<AtomicU64>,
    /// Cycles that ended with a failure notification
    pub(crate) cycles_failed: Arc<AtomicU64>,
    /// Stages that reached `Succeeded`
    pub(crate) stages_completed: Arc<AtomicU64>,
    /// Scheduled `process_events()` drains
    pub(crate) event_drains: Arc<AtomicU64>,
    /// Completions ignored because their cycle or stage was already over
    pub(crate) stale_callbacks: Arc<AtomicU64>,
}

impl ProcessMetricsStorage {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle for querying process metrics.
///
/// Cloneable, lightweight handle (only Arc pointers).
#[derive(Clone, Debug)]
pub struct ProcessMetrics {
    storage: ProcessMetricsStorage,
}

impl ProcessMetrics {
    pub(crate) fn new(storage: ProcessMetricsStorage) -> Self {
        Self { storage }
    }

    /// Cycles whose radio init was issued successfully.
    pub fn cycles_started_total(&self) -> u64 {
        self.storage.cycles_started.load(Ordering::Relaxed)
    }

    /// Cycles that delivered `Ok(())` to the ready callback.
    pub fn cycles_succeeded_total(&self) -> u64 {
        self.storage.cycles_succeeded.load(Ordering::Relaxed)
    }

    /// Cycles that delivered an error to the ready callback.
    pub fn cycles_failed_total(&self) -> u64 {
        self.storage.cycles_failed.load(Ordering::Relaxed)
    }

    /// Stages completed successfully, across all cycles.
    pub fn stages_completed_total(&self) -> u64 {
        self.storage.stages_completed.load(Ordering::Relaxed)
    }

    /// Event drains executed on the scheduler.
    pub fn event_drains_total(&self) -> u64 {
        self.storage.event_drains.load(Ordering::Relaxed)
    }

    /// Late completions that were ignored.
    pub fn stale_callbacks_total(&self) -> u64 {
        self.storage.stale_callbacks.load(Ordering::Relaxed)
    }
}
