use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use uuid::Uuid;

/// Identifier of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a submission.
///
/// `Queued -> Running -> {Completed | Failed | Cancelled}`; the last three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecState {
    Queued = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl From<u8> for ExecState {
    fn from(value: u8) -> Self {
        match value {
            0 => ExecState::Queued,
            1 => ExecState::Running,
            2 => ExecState::Completed,
            3 => ExecState::Failed,
            4 => ExecState::Cancelled,
            _ => ExecState::Failed,
        }
    }
}

impl ExecState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecState::Completed | ExecState::Failed | ExecState::Cancelled
        )
    }
}

/// Per-submission state shared between the submitter and the worker
#[derive(Debug)]
pub struct Ticket {
    id: SubmissionId,
    state: AtomicU8,
    cancel_requested: AtomicBool,
}

impl Ticket {
    pub fn new() -> Self {
        Self {
            id: SubmissionId::new(),
            state: AtomicU8::new(ExecState::Queued as u8),
            cancel_requested: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn state(&self) -> ExecState {
        ExecState::from(self.state.load(Ordering::Acquire))
    }

    /// Atomically move from `expected` to `new`; on failure returns the
    /// state actually found
    pub fn transition(&self, expected: ExecState, new: ExecState) -> Result<ExecState, ExecState> {
        match self.state.compare_exchange(
            expected as u8,
            new as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(new),
            Err(actual) => Err(ExecState::from(actual)),
        }
    }

    /// Record a cancellation request.
    ///
    /// Returns `false` if the submission already reached a terminal state,
    /// in which case the request has no effect.
    pub fn request_cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.cancel_requested.store(true, Ordering::Release);
        true
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }
}

impl Default for Ticket {
    fn default() -> Self {
        Self::new()
    }
}
