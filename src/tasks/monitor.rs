use crate::core::errors::CmdError;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::{info, warn};

/// Lifecycle notifications for one submission.
///
/// All callbacks run synchronously on the worker thread executing the item,
/// in this order: `on_start`, `update(1)` .. `update(n)`, then exactly one of
/// `on_end`, `on_abort` or `on_cancel`. Workers are shared between
/// submissions, so implementations must not block for long.
pub trait ExecMonitor<T>: Send + Sync {
    /// Called once before the first unit of work
    fn on_start(&self) {}

    /// Called after each completed unit of work, `step` counting from 1
    fn update(&self, _step: usize) {}

    /// Normal completion
    fn on_end(&self, _result: &T) {}

    /// An error or panic escaped a unit of work
    fn on_abort(&self, _cause: &CmdError) {}

    /// Cancellation was observed at a step boundary
    fn on_cancel(&self) {}
}

/// Monitor that reports every notification as a `tracing` event
pub struct LogMonitor<T> {
    label: String,
    _result: PhantomData<fn(&T)>,
}

impl<T> LogMonitor<T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            _result: PhantomData,
        }
    }
}

impl<T: Debug> ExecMonitor<T> for LogMonitor<T> {
    fn on_start(&self) {
        info!(label = %self.label, "Work started");
    }

    fn update(&self, step: usize) {
        info!(label = %self.label, step, "Step completed");
    }

    fn on_end(&self, result: &T) {
        info!(label = %self.label, result = ?result, "Work finished");
    }

    fn on_abort(&self, cause: &CmdError) {
        warn!(label = %self.label, error = %cause, "Work aborted");
    }

    fn on_cancel(&self) {
        info!(label = %self.label, "Work cancelled");
    }
}
