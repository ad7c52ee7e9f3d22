//! Single-threaded event scheduler.
//!
//! ## Architecture
//!
//! ```text
//! hardware thread ──┐
//! radio callback ───┼──→ SchedulerHandle ──→ [FIFO channel] ──→ EventScheduler
//! stage code ───────┘        (Send)                              (one thread)
//!                                                                    │
//!                                              [timer heap] ←────────┘
//! ```
//!
//! Every piece of process and chain logic runs inside a work item drained by
//! one `EventScheduler`. Other threads only ever enqueue. Immediate items run
//! in submission order; timers run when due, ordered by deadline then by the
//! order they were armed.

mod timer;

use bleproc_shared::errors::{BleError, BleResult};
use std::time::Duration;
use timer::TimerQueue;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Deferred unit of work.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(WorkItem),
    RunAt(Instant, WorkItem),
    Stop,
}

/// Cloneable, thread-safe submission side of an [`EventScheduler`].
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Queue `work` to run after everything already queued.
    pub fn schedule<F>(&self, work: F) -> BleResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Command::Run(Box::new(work)))
            .map_err(|_| BleError::SchedulerStopped)
    }

    /// Arm a timer that runs `work` once `delay` has elapsed.
    ///
    /// The deadline is taken at submission time.
    pub fn schedule_after<F>(&self, delay: Duration, work: F) -> BleResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        self.tx
            .send(Command::RunAt(deadline, Box::new(work)))
            .map_err(|_| BleError::SchedulerStopped)
    }

    /// Ask the scheduler to return from its drain loop.
    ///
    /// Items queued before the stop request still run first.
    pub fn stop(&self) {
        if self.tx.send(Command::Stop).is_err() {
            tracing::debug!("Stop requested on a scheduler that is already gone");
        }
    }
}

/// FIFO/timer work queue drained on a single logical thread.
///
/// # Example
///
/// ```ignore
/// let mut scheduler = EventScheduler::new();
/// let handle = scheduler.handle();
/// handle.schedule(|| println!("first"))?;
/// handle.schedule_after(Duration::from_millis(5), || println!("later"))?;
/// handle.schedule_after(Duration::from_millis(10), {
///     let handle = handle.clone();
///     move || handle.stop()
/// })?;
/// scheduler.run_forever().await;
/// ```
pub struct EventScheduler {
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    timers: TimerQueue,
    stopped: bool,
}

impl EventScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            timers: TimerQueue::default(),
            stopped: false,
        }
    }

    /// Submission handle; clone freely and send across threads.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Number of armed timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Drain work until a stop request is dequeued.
    ///
    /// Sleeps while idle, waking for new submissions or the next timer.
    pub async fn run_forever(&mut self) {
        self.stopped = false;
        tracing::debug!("Event scheduler running");

        loop {
            self.fire_due_timers();

            let command = match self.timers.next_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        command = self.rx.recv() => command,
                        _ = tokio::time::sleep_until(deadline) => continue,
                    }
                }
                None => self.rx.recv().await,
            };

            let Some(command) = command else {
                break;
            };
            self.dispatch(command);
            if self.stopped {
                break;
            }
        }

        tracing::debug!(
            pending_timers = self.timers.len(),
            "Event scheduler stopped"
        );
    }

    /// Run every item that is runnable right now without waiting.
    ///
    /// Returns the number of work items executed. Items queued by the items
    /// being run are drained too. Stops early on a stop request.
    pub fn run_until_idle(&mut self) -> usize {
        self.stopped = false;
        let mut ran = 0;

        loop {
            ran += self.fire_due_timers();

            match self.rx.try_recv() {
                Ok(command) => {
                    if self.dispatch(command) {
                        ran += 1;
                    }
                    if self.stopped {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        ran
    }

    /// Returns true if a work item was executed.
    fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Run(work) => {
                work();
                true
            }
            Command::RunAt(deadline, work) => {
                self.timers.arm(deadline, work);
                false
            }
            Command::Stop => {
                self.stopped = true;
                false
            }
        }
    }

    fn fire_due_timers(&mut self) -> usize {
        let now = Instant::now();
        let mut fired = 0;
        while let Some(work) = self.timers.pop_due(now) {
            work();
            fired += 1;
        }
        fired
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}
