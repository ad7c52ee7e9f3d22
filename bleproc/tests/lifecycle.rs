//! Integration tests for process lifecycle (start, stop, restart, stale completions).

use bleproc::{BleError, ChainBuilder, ProcessState, SecurityConfig};
use bleproc_test_utils::{Behavior, Harness, Op, RadioCall};
use parking_lot::Mutex;
use std::sync::Arc;

fn harness() -> Harness {
    let chain = ChainBuilder::new()
        .with_security(SecurityConfig::default())
        .build()
        .unwrap();
    Harness::new(chain)
}

fn shutdowns(h: &Harness) -> usize {
    h.radio.count(|c| *c == RadioCall::Shutdown)
}

// ============================================================================
// START GUARDS
// ============================================================================

#[test]
fn start_on_initialized_radio_issues_no_hardware_calls() {
    let mut h = harness();
    h.radio.set_initialized(true);

    assert_eq!(h.process.start(), Err(BleError::AlreadyInitialized));
    h.run();

    assert!(h.radio.calls().is_empty());
    assert!(h.outcomes().is_empty());
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
}

#[test]
fn second_start_does_not_disturb_first_cycle() {
    let mut h = harness();
    h.radio.set_behavior(Op::Initialize, Behavior::Hold);

    h.process.start().unwrap();
    assert_eq!(h.process.start(), Err(BleError::AlreadyInitialized));

    assert!(h.radio.release(Op::Initialize, Ok(())));
    h.run();

    assert_eq!(h.outcomes(), vec![Ok(())]);
    assert_eq!(h.radio.count(|c| *c == RadioCall::Initialize), 1);
    assert_eq!(h.process.cycle(), 1);
}

#[test]
fn start_after_ready_requires_stop() {
    let mut h = harness();
    h.process.start().unwrap();
    h.run();
    assert_eq!(h.process.state(), ProcessState::Ready);

    assert_eq!(h.process.start(), Err(BleError::AlreadyInitialized));
}

#[test]
fn start_after_failure_requires_stop() {
    let mut h = harness();
    h.radio
        .set_behavior(Op::Initialize, Behavior::FailAsync(bleproc::RadioError::NoMemory));
    h.process.start().unwrap();
    h.run();
    assert_eq!(h.process.state(), ProcessState::Failed);

    assert_eq!(h.process.start(), Err(BleError::AlreadyInitialized));

    h.process.stop();
    // The radio never came up, so there is nothing to shut down
    assert_eq!(shutdowns(&h), 0);
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
}

// ============================================================================
// STOP
// ============================================================================

#[test]
fn stop_is_idempotent() {
    let mut h = harness();
    h.process.start().unwrap();
    h.run();

    h.process.stop();
    h.process.stop();
    h.process.stop();

    assert_eq!(shutdowns(&h), 1);
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
    assert!(!h.radio.has_notifier());
}

#[test]
fn stop_before_start_is_harmless() {
    let h = harness();
    h.process.stop();
    assert_eq!(shutdowns(&h), 0);
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
}

#[test]
fn stale_stage_completion_after_stop_is_ignored() {
    let mut h = harness();
    h.radio.set_behavior(Op::Security, Behavior::Hold);

    h.process.start().unwrap();
    h.run();
    assert_eq!(h.process.state(), ProcessState::StageChainRunning);

    h.process.stop();
    assert_eq!(shutdowns(&h), 1);

    assert!(h.radio.release(Op::Security, Ok(())));
    h.run();

    assert!(h.outcomes().is_empty());
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
    assert_eq!(h.process.metrics().stale_callbacks_total(), 1);
    assert!(!h.process.chain().is_running());
}

#[test]
fn stale_hardware_completion_after_stop_is_ignored() {
    let mut h = harness();
    h.radio.set_behavior(Op::Initialize, Behavior::Hold);

    h.process.start().unwrap();
    h.process.stop();
    assert_eq!(shutdowns(&h), 0);

    assert!(h.radio.release(Op::Initialize, Ok(())));
    h.run();

    assert!(h.outcomes().is_empty());
    assert_eq!(h.process.state(), ProcessState::Uninitialized);
    assert_eq!(h.process.metrics().stale_callbacks_total(), 1);
    assert_eq!(h.radio.count(|c| matches!(c, RadioCall::InitSecurity(_))), 0);

    // The radio came up late; a second stop() shuts it down
    h.process.stop();
    assert_eq!(shutdowns(&h), 1);
}

#[test]
fn drop_stops_the_process() {
    let mut h = harness();
    h.process.start().unwrap();
    h.run();

    let radio = Arc::clone(&h.radio);
    drop(h);

    assert_eq!(radio.count(|c| *c == RadioCall::Shutdown), 1);
}

// ============================================================================
// RESTART
// ============================================================================

#[test]
fn restart_after_stop_runs_a_fresh_cycle() {
    let mut h = harness();
    h.process.start().unwrap();
    h.run();
    h.process.stop();

    h.process.start().unwrap();
    h.run();

    assert_eq!(h.outcomes(), vec![Ok(()), Ok(())]);
    assert_eq!(h.process.cycle(), 2);
    assert_eq!(h.process.state(), ProcessState::Ready);
    assert_eq!(h.radio.count(|c| *c == RadioCall::Initialize), 2);
    assert_eq!(h.process.metrics().cycles_succeeded_total(), 2);
}

#[test]
fn old_cycle_completion_does_not_leak_into_new_cycle() {
    let mut h = harness();
    h.radio.set_behavior(Op::Initialize, Behavior::Hold);
    h.process.start().unwrap();
    h.process.stop();

    // Keep the first cycle's completion aside, start a second cycle
    let radio = Arc::clone(&h.radio);
    h.radio.set_behavior(Op::Initialize, Behavior::Succeed);
    h.process.start().unwrap();
    assert!(radio.release(Op::Initialize, Ok(())));
    h.run();

    assert_eq!(h.outcomes(), vec![Ok(())]);
    assert_eq!(h.process.cycle(), 2);
    assert_eq!(h.process.metrics().stale_callbacks_total(), 1);
    assert_eq!(h.radio.count(|c| matches!(c, RadioCall::InitSecurity(_))), 1);
}

// ============================================================================
// READY CALLBACK
// ============================================================================

#[test]
fn on_ready_replaces_previous_callback() {
    let mut h = harness();
    let second = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&second);
    h.process.on_ready(move |outcome| sink.lock().push(outcome.clone()));

    h.process.start().unwrap();
    h.run();

    assert!(h.outcomes().is_empty(), "replaced callback must not run");
    assert_eq!(*second.lock(), vec![Ok(())]);
}

#[test]
fn callback_runs_once_per_cycle() {
    let mut h = harness();
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    h.process.on_ready(move |_| *counter.lock() += 1);

    h.process.start().unwrap();
    h.run();
    h.run();
    h.process.stop();
    h.process.start().unwrap();
    h.run();

    assert_eq!(*count.lock(), 2);
}
