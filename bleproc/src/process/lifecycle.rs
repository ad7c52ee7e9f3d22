//! Process lifecycle: start, hardware completion, outcome delivery, stop.
//!
//! Radio callbacks only schedule work; everything below except `start` and
//! `stop` runs on the scheduler.

use super::{Outcome, ProcessShared, ProcessState};
use crate::chain::ChainEnv;
use crate::metrics::ProcessMetricsStorage;
use bleproc_shared::errors::{BleError, BleResult, RadioError};
use bleproc_shared::radio::{Completion, EventNotifier};
use std::sync::{Arc, Weak};

pub(super) fn start(shared: &Arc<ProcessShared>) -> BleResult<()> {
    {
        let status = shared.status.lock();
        if !status.state.can_start() {
            tracing::warn!(state = %status.state, "start() rejected: cycle already in progress");
            return Err(BleError::AlreadyInitialized);
        }
    }

    if shared.radio.has_initialized() {
        tracing::warn!("start() rejected: radio stack already initialized");
        return Err(BleError::AlreadyInitialized);
    }

    let cycle = {
        let mut status = shared.status.lock();
        if !status.state.can_start() {
            return Err(BleError::AlreadyInitialized);
        }
        status.cycle += 1;
        status.state = ProcessState::HardwareInitPending;
        status.cycle
    };

    shared.radio.set_event_notifier(Some(event_notifier(shared)));

    if let Err(e) = shared.radio.initialize(hardware_completion(shared, cycle)) {
        tracing::error!(cycle, "Radio initialization rejected: {}", e);
        shared.radio.set_event_notifier(None);
        let mut status = shared.status.lock();
        if status.cycle == cycle {
            status.state = ProcessState::Uninitialized;
        }
        return Err(BleError::Radio(e));
    }

    ProcessMetricsStorage::incr(&shared.metrics.cycles_started);
    tracing::info!(cycle, "Radio initialization issued");
    Ok(())
}

pub(super) fn stop(shared: &ProcessShared) {
    shared.chain.abandon();

    let previous = {
        let mut status = shared.status.lock();
        std::mem::replace(&mut status.state, ProcessState::Uninitialized)
    };

    shared.radio.set_event_notifier(None);

    if shared.radio.has_initialized() {
        shared.radio.shutdown();
        tracing::info!(previous = %previous, "Radio stack shut down");
    } else {
        tracing::debug!(previous = %previous, "Stopped; radio was not initialized");
    }
}

/// Completion for `initialize()`: queues [`on_hardware_init`] on the scheduler.
fn hardware_completion(shared: &Arc<ProcessShared>, cycle: u64) -> Completion {
    let weak = Arc::downgrade(shared);
    let scheduler = shared.scheduler.clone();

    Box::new(move |result| {
        let scheduled = scheduler.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                on_hardware_init(&shared, cycle, result);
            }
        });
        if let Err(e) = scheduled {
            tracing::warn!(cycle, "Dropping hardware init completion: {}", e);
        }
    })
}

fn on_hardware_init(shared: &Arc<ProcessShared>, cycle: u64, result: Result<(), RadioError>) {
    {
        let mut status = shared.status.lock();
        if status.cycle != cycle || status.state != ProcessState::HardwareInitPending {
            drop(status);
            ProcessMetricsStorage::incr(&shared.metrics.stale_callbacks);
            tracing::debug!(cycle, "Ignoring stale hardware init completion");
            return;
        }
        if result.is_ok() {
            status.state = ProcessState::StageChainRunning;
        }
    }

    match result {
        Ok(()) => {
            tracing::info!(cycle, stages = shared.chain.len(), "Radio hardware ready, running stages");
            let env = ChainEnv {
                radio: Arc::clone(&shared.radio),
                scheduler: shared.scheduler.clone(),
                on_outcome: outcome_sink(Arc::downgrade(shared)),
            };
            shared.chain.begin(cycle, env);
        }
        Err(e) => {
            tracing::error!(cycle, "Radio hardware initialization failed: {}", e);
            finish_cycle(shared, cycle, Err(BleError::HardwareInitFailed(e)));
        }
    }
}

fn outcome_sink(weak: Weak<ProcessShared>) -> crate::chain::OutcomeSink {
    Arc::new(move |cycle, outcome| {
        if let Some(shared) = weak.upgrade() {
            finish_cycle(&shared, cycle, outcome);
        }
    })
}

/// Record the terminal state and hand the outcome to the ready callback once.
fn finish_cycle(shared: &ProcessShared, cycle: u64, outcome: Outcome) {
    let target = if outcome.is_ok() {
        ProcessState::Ready
    } else {
        ProcessState::Failed
    };

    {
        let mut status = shared.status.lock();
        if status.cycle != cycle || !status.state.is_busy() {
            tracing::debug!(cycle, state = %status.state, "Dropping outcome for finished cycle");
            return;
        }
        status.state = target;
    }

    match &outcome {
        Ok(()) => {
            ProcessMetricsStorage::incr(&shared.metrics.cycles_succeeded);
            tracing::info!(cycle, "BLE process ready");
        }
        Err(e) => {
            ProcessMetricsStorage::incr(&shared.metrics.cycles_failed);
            tracing::error!(cycle, stage = ?e.stage(), "BLE process initialization failed: {}", e);
        }
    }

    // Called without the lock so the callback may call back into the process.
    let callback = shared.on_ready.lock().take();
    match callback {
        Some(mut callback) => {
            callback(&outcome);
            let mut slot = shared.on_ready.lock();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
        None => tracing::warn!(cycle, "No ready callback registered; outcome dropped"),
    }
}

/// Notifier handed to the radio: queues an event drain, nothing more.
fn event_notifier(shared: &Arc<ProcessShared>) -> EventNotifier {
    let weak = Arc::downgrade(shared);
    let scheduler = shared.scheduler.clone();

    Arc::new(move || {
        let weak = weak.clone();
        let scheduled = scheduler.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                drain_events(&shared);
            }
        });
        if let Err(e) = scheduled {
            tracing::debug!("Dropping event notification: {}", e);
        }
    })
}

fn drain_events(shared: &ProcessShared) {
    if shared.status.lock().state == ProcessState::Uninitialized {
        tracing::debug!("Skipping event drain for stopped process");
        return;
    }
    ProcessMetricsStorage::incr(&shared.metrics.event_drains);
    shared.radio.process_events();
}
