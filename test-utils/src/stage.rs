//! Stage double that records when it runs.

use bleproc::chain::{Progress, Stage, StageCompleter, StageContext, StageError, StageId};
use bleproc_shared::errors::RadioError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Shared, ordered record of stage invocations.
#[derive(Clone, Default)]
pub struct StageLog {
    entries: Arc<Mutex<Vec<(String, ThreadId)>>>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage ids in the order `begin` ran.
    pub fn order(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.entries.lock().iter().map(|(_, t)| *t).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, id: &StageId) {
        self.entries
            .lock()
            .push((id.to_string(), thread::current().id()));
    }
}

/// What a [`RecordingStage`] does when it runs.
#[derive(Debug, Clone)]
pub enum StageBehavior {
    /// Finish inside `begin`.
    Done,
    /// Fail inside `begin`.
    FailSync(StageError),
    /// Complete through the completer before `begin` returns.
    CompleteAsync(Result<(), RadioError>),
    /// Keep the completer for [`RecordingStage::completer`].
    Hold,
    /// Complete through the completer with `Ok`, then fail inside `begin`.
    CompleteThenFail(StageError),
    /// Complete through the completer with `Ok`, then also return `Done`.
    CompleteThenDone,
}

/// Custom stage that logs each `begin` and follows a scripted behavior.
pub struct RecordingStage {
    id: StageId,
    behavior: StageBehavior,
    log: StageLog,
    held: Arc<Mutex<Option<StageCompleter>>>,
}

impl RecordingStage {
    pub fn new(id: impl Into<String>, behavior: StageBehavior, log: &StageLog) -> Self {
        Self {
            id: StageId::new(id.into()),
            behavior,
            log: log.clone(),
            held: Arc::new(Mutex::new(None)),
        }
    }

    /// Slot that receives the completer when the behavior is `Hold`.
    pub fn completer(&self) -> Arc<Mutex<Option<StageCompleter>>> {
        Arc::clone(&self.held)
    }
}

impl Stage for RecordingStage {
    fn id(&self) -> StageId {
        self.id.clone()
    }

    fn begin(&self, cx: StageContext) -> Result<Progress, StageError> {
        self.log.push(&self.id);

        match &self.behavior {
            StageBehavior::Done => Ok(Progress::Done),
            StageBehavior::FailSync(e) => Err(e.clone()),
            StageBehavior::CompleteAsync(result) => {
                cx.into_completer().complete(*result);
                Ok(Progress::Pending)
            }
            StageBehavior::Hold => {
                *self.held.lock() = Some(cx.into_completer());
                Ok(Progress::Pending)
            }
            StageBehavior::CompleteThenFail(e) => {
                cx.into_completer().complete(Ok(()));
                Err(e.clone())
            }
            StageBehavior::CompleteThenDone => {
                cx.into_completer().complete(Ok(()));
                Ok(Progress::Done)
            }
        }
    }
}
