use thiserror::Error;

use crate::history_store::{HistoryError, LockError};
use crate::monitor::{Breach, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Loading,
    Sampling,
    Evaluating,
    Reporting,
    Persisting,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Loading => "loading",
            RunPhase::Sampling => "sampling",
            RunPhase::Evaluating => "evaluating",
            RunPhase::Reporting => "reporting",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Phases entered, in order, ending with `Done`.
    pub phases: Vec<RunPhase>,
    pub breaches: Vec<Breach>,
    /// `None` when no report was due, otherwise whether the notifier accepted it.
    pub delivered: Option<bool>,
    pub history_len: usize,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Another invocation held the run lock; nothing was touched.
    Skipped { reason: String },
    /// `phase` is the phase that was active when the run gave up.
    Failed { phase: RunPhase, error: RunError },
}
