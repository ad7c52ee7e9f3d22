//! Hardware callbacks from foreign threads are serialized onto the scheduler.

use bleproc::{ChainBuilder, SecurityConfig};
use bleproc_test_utils::{Behavior, Harness, Op, RecordingStage, StageBehavior, StageLog};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(deadline: Instant, cond: impl Fn() -> bool) -> bool {
    while !cond() {
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

#[tokio::test]
async fn notifications_from_other_threads_never_overlap_chain_work() {
    let log = StageLog::new();
    let chain = ChainBuilder::new()
        .with_security(SecurityConfig::default())
        .stage(RecordingStage::new("custom", StageBehavior::Done, &log))
        .build()
        .unwrap();
    let mut h = Harness::new(chain);
    h.radio.set_behavior(Op::Initialize, Behavior::Hold);
    h.radio.set_behavior(Op::Security, Behavior::Hold);

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let stopper = h.scheduler.handle();
    h.process.on_ready(move |outcome| {
        sink.lock().push(outcome.clone());
        stopper.stop();
    });

    h.process.start().unwrap();

    let radio = Arc::clone(&h.radio);
    let hardware = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        for _ in 0..10 {
            radio.notify_events_pending();
        }
        assert!(radio.release(Op::Initialize, Ok(())));
        for _ in 0..10 {
            radio.notify_events_pending();
        }
        assert!(wait_until(deadline, || radio.is_holding(Op::Security)));
        assert!(radio.release(Op::Security, Ok(())));
    });

    tokio::time::timeout(Duration::from_secs(10), h.scheduler.run_forever())
        .await
        .expect("scheduler did not finish");
    hardware.join().unwrap();
    h.run();

    assert_eq!(*outcomes.lock(), vec![Ok(())]);
    assert_eq!(log.order(), vec!["custom"]);

    let scheduler_thread = thread::current().id();
    assert_eq!(log.threads(), vec![scheduler_thread]);
    let callers = h.radio.calling_threads();
    assert_eq!(callers.len(), 1, "radio touched from {callers:?}");
    assert!(callers.contains(&scheduler_thread));
    assert_eq!(h.process.metrics().event_drains_total(), 20);
}
