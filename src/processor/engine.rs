//! Per-submission execution: drives one work item through the monitor
//! protocol on the current (worker) thread and resolves its future.

use crate::core::errors::CmdError;
use crate::core::metrics::ProcessorMetrics;
use crate::processor::ticket::{ExecState, SubmissionId, Ticket};
use crate::sync::CmdFuture;
use crate::tasks::{ExecMonitor, Invocation, MultiStepTask, ResultAssembler, Runnable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Step source bound to the assembler that folds its partial results
pub(crate) trait Assembly<O>: Send {
    fn total_steps(&self) -> usize;

    /// Run the next step and feed its partial result to the assembler.
    /// Returns whether the source considers itself finished.
    fn run_step(&mut self) -> anyhow::Result<bool>;

    fn assemble(self: Box<Self>) -> O;
}

pub(crate) struct ChainAssembly<T, A> {
    links: std::vec::IntoIter<Box<dyn Invocation<T>>>,
    total: usize,
    assembler: A,
}

impl<T, A> ChainAssembly<T, A> {
    pub(crate) fn new(links: Vec<Box<dyn Invocation<T>>>, assembler: A) -> Self {
        Self {
            total: links.len(),
            links: links.into_iter(),
            assembler,
        }
    }
}

impl<T, A> Assembly<<A as ResultAssembler<T>>::Output> for ChainAssembly<T, A>
where
    T: 'static,
    A: ResultAssembler<T>,
{
    fn total_steps(&self) -> usize {
        self.total
    }

    fn run_step(&mut self) -> anyhow::Result<bool> {
        if let Some(mut link) = self.links.next() {
            let partial = link.call()?;
            self.assembler.add(partial);
        }
        Ok(self.links.len() == 0)
    }

    fn assemble(self: Box<Self>) -> <A as ResultAssembler<T>>::Output {
        self.assembler.assemble()
    }
}

pub(crate) struct TaskAssembly<T, A> {
    task: Box<dyn MultiStepTask<T>>,
    assembler: A,
}

impl<T, A> TaskAssembly<T, A> {
    pub(crate) fn new(task: Box<dyn MultiStepTask<T>>, assembler: A) -> Self {
        Self { task, assembler }
    }
}

impl<T, A> Assembly<<A as ResultAssembler<T>>::Output> for TaskAssembly<T, A>
where
    T: 'static,
    A: ResultAssembler<T>,
{
    fn total_steps(&self) -> usize {
        self.task.total_steps()
    }

    fn run_step(&mut self) -> anyhow::Result<bool> {
        let step = self.task.do_step()?;
        let finished = step.is_finished();
        self.assembler.add(step.into_partial());
        Ok(finished)
    }

    fn assemble(self: Box<Self>) -> <A as ResultAssembler<T>>::Output {
        self.assembler.assemble()
    }
}

/// One submitted unit of work, tagged by kind
pub(crate) enum WorkItem<O> {
    /// Runs for side effects only and resolves to a fixed value
    Plain { body: Box<dyn Runnable>, result: O },
    Single(Box<dyn Invocation<O>>),
    Chain(Box<dyn Assembly<O>>),
    MultiStep(Box<dyn Assembly<O>>),
}

impl<O> WorkItem<O> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            WorkItem::Plain { .. } => "plain",
            WorkItem::Single(_) => "single",
            WorkItem::Chain(_) => "chain",
            WorkItem::MultiStep(_) => "multi-step",
        }
    }
}

enum Verdict<O> {
    Completed(O),
    Failed(CmdError),
    Cancelled,
}

/// Bookkeeping shared by the processor and every execution
#[derive(Default)]
pub(crate) struct Bookkeeping {
    pub(crate) in_flight: Mutex<HashMap<SubmissionId, Arc<Ticket>>>,
    pub(crate) metrics: ProcessorMetrics,
}

impl Bookkeeping {
    fn forget(&self, id: SubmissionId) {
        self.in_flight.lock().remove(&id);
    }
}

/// Everything a worker needs to run one submission
pub(crate) struct Execution<O> {
    pub(crate) ticket: Arc<Ticket>,
    pub(crate) monitor: Option<Arc<dyn ExecMonitor<O>>>,
    pub(crate) future: CmdFuture<O>,
    pub(crate) books: Arc<Bookkeeping>,
}

impl<O: Send + 'static> Execution<O> {
    pub(crate) fn run(self, item: WorkItem<O>) {
        let started = Instant::now();
        let id = self.ticket.id();
        debug!(id = %id, kind = item.kind(), "Submission dequeued");

        // Work-unit and terminal-callback panics are caught further down;
        // anything reaching here came from `on_start`.
        let lifecycle = catch_unwind(AssertUnwindSafe(|| self.lifecycle(item, started)));
        if let Err(payload) = lifecycle {
            let err = CmdError::from_panic(payload);
            error!(id = %id, error = %err, "Monitor callback panicked");
            self.force_terminal(ExecState::Failed);
            self.books.forget(id);
            if self.future.try_set(Err(err)) {
                self.books.metrics.record_failed(started.elapsed());
            }
        }
    }

    fn lifecycle(&self, item: WorkItem<O>, started: Instant) {
        if let Err(found) = self.ticket.transition(ExecState::Queued, ExecState::Running) {
            warn!(id = %self.ticket.id(), state = ?found, "Submission not in queued state");
        }
        self.notify(|m| m.on_start());

        let verdict = match catch_unwind(AssertUnwindSafe(|| self.drive(item))) {
            Ok(verdict) => verdict,
            Err(payload) => Verdict::Failed(CmdError::from_panic(payload)),
        };
        self.finish(verdict, started.elapsed());
    }

    fn drive(&self, item: WorkItem<O>) -> Verdict<O> {
        match item {
            WorkItem::Plain { mut body, result } => {
                if self.ticket.cancel_requested() {
                    return Verdict::Cancelled;
                }
                match body.run() {
                    Ok(()) => {
                        self.notify(|m| m.update(1));
                        Verdict::Completed(result)
                    }
                    Err(e) => Verdict::Failed(CmdError::work(e)),
                }
            }
            WorkItem::Single(mut invocation) => {
                if self.ticket.cancel_requested() {
                    return Verdict::Cancelled;
                }
                match invocation.call() {
                    Ok(value) => {
                        self.notify(|m| m.update(1));
                        Verdict::Completed(value)
                    }
                    Err(e) => Verdict::Failed(CmdError::work(e)),
                }
            }
            WorkItem::Chain(assembly) | WorkItem::MultiStep(assembly) => self.drive_steps(assembly),
        }
    }

    fn drive_steps(&self, mut assembly: Box<dyn Assembly<O>>) -> Verdict<O> {
        let declared = assembly.total_steps();
        for step in 1..=declared {
            if self.ticket.cancel_requested() {
                debug!(id = %self.ticket.id(), step, "Cancellation observed at step boundary");
                return Verdict::Cancelled;
            }
            let finished = match assembly.run_step() {
                Ok(finished) => finished,
                Err(e) => return Verdict::Failed(CmdError::work(e)),
            };
            self.notify(|m| m.update(step));
            if finished != (step == declared) {
                return Verdict::Failed(CmdError::StepCountMismatch { declared, step });
            }
        }
        Verdict::Completed(assembly.assemble())
    }

    // The terminal callback runs before the outcome is committed, so the
    // ticket state, metrics and future always describe the same outcome.
    fn finish(&self, verdict: Verdict<O>, elapsed: Duration) {
        let id = self.ticket.id();
        let verdict = self.deliver_terminal(verdict);
        let metrics = &self.books.metrics;
        let result = match verdict {
            Verdict::Completed(value) => {
                self.force_terminal(ExecState::Completed);
                self.books.forget(id);
                metrics.record_completed(elapsed);
                debug!(id = %id, elapsed_ms = elapsed.as_millis() as u64, "Submission completed");
                Ok(value)
            }
            Verdict::Failed(err) => {
                self.force_terminal(ExecState::Failed);
                self.books.forget(id);
                metrics.record_failed(elapsed);
                warn!(id = %id, error = %err, "Submission aborted");
                Err(err)
            }
            Verdict::Cancelled => {
                self.force_terminal(ExecState::Cancelled);
                self.books.forget(id);
                metrics.record_cancelled(elapsed);
                debug!(id = %id, "Submission cancelled");
                Err(CmdError::Cancelled)
            }
        };
        self.future.set(result);
    }

    /// Fire the monitor's terminal callback. A panic in `on_end` or
    /// `on_cancel` turns the outcome into `Failed(Panicked)`; a panic in
    /// `on_abort` keeps the original cause.
    fn deliver_terminal(&self, verdict: Verdict<O>) -> Verdict<O> {
        let delivered = catch_unwind(AssertUnwindSafe(|| match &verdict {
            Verdict::Completed(value) => self.notify(|m| m.on_end(value)),
            Verdict::Failed(err) => self.notify(|m| m.on_abort(err)),
            Verdict::Cancelled => self.notify(|m| m.on_cancel()),
        }));
        let Err(payload) = delivered else {
            return verdict;
        };

        let panic = CmdError::from_panic(payload);
        error!(id = %self.ticket.id(), error = %panic, "Terminal monitor callback panicked");
        match verdict {
            Verdict::Failed(cause) => Verdict::Failed(cause),
            Verdict::Completed(_) | Verdict::Cancelled => Verdict::Failed(panic),
        }
    }

    fn force_terminal(&self, state: ExecState) {
        if let Err(found) = self.ticket.transition(ExecState::Running, state) {
            if !found.is_terminal() {
                let _ = self.ticket.transition(found, state);
            }
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn ExecMonitor<O>)) {
        if let Some(monitor) = self.monitor.as_deref() {
            f(monitor);
        }
    }
}
