use crate::core::config::ProcessorConfig;
use crate::core::errors::{CmdError, Result, StartError};
use crate::core::metrics::MetricsSnapshot;
use crate::processor::engine::{Bookkeeping, ChainAssembly, Execution, TaskAssembly, WorkItem};
use crate::processor::ready_queue::ReadyQueue;
use crate::processor::ticket::{ExecState, SubmissionId, Ticket};
use crate::sync::CmdFuture;
use crate::tasks::{
    ExecMonitor, Invocation, InvocationChain, ListAssembler, MultiStepTask, ResultAssembler,
    Runnable,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce() + Send>;

struct Inner {
    queue: ReadyQueue<Job>,
    books: Arc<Bookkeeping>,
    accepting: AtomicBool,
}

/// Runs submitted work items on a fixed pool of worker threads.
///
/// Submission never blocks: every `exec*` method queues the item and returns
/// a [`Submission`] straight away, or an admission error if the queue is full
/// or the processor has been shut down. Each item then runs start to finish
/// on one worker, which delivers the [`ExecMonitor`] callbacks and resolves
/// the submission's [`CmdFuture`].
pub struct CmdProcessor {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: ProcessorConfig,
}

impl CmdProcessor {
    /// Validate `config` and start the worker threads
    pub fn new(config: ProcessorConfig) -> std::result::Result<Self, StartError> {
        config.validate()?;

        let inner = Arc::new(Inner {
            queue: ReadyQueue::new(config.queue_capacity),
            books: Arc::new(Bookkeeping::default()),
            accepting: AtomicBool::new(true),
        });

        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name, index));
            if let Some(size) = config.stack_size {
                builder = builder.stack_size(size);
            }
            let worker_inner = Arc::clone(&inner);
            match builder.spawn(move || worker_loop(index, worker_inner)) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker = index, error = %e, "Failed to spawn worker thread");
                    inner.accepting.store(false, Ordering::Release);
                    inner.queue.close();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(StartError::Spawn {
                        worker: index,
                        source: e,
                    });
                }
            }
        }

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Command processor started"
        );

        Ok(Self {
            inner,
            workers: Mutex::new(workers),
            config,
        })
    }

    /// Processor with `workers` threads and default settings otherwise
    pub fn with_workers(workers: usize) -> std::result::Result<Self, StartError> {
        Self::new(ProcessorConfig::builder().workers(workers).build()?)
    }

    /// Run a side-effect-only unit of work; resolves to `()`
    pub fn exec<R>(
        &self,
        body: R,
        monitor: Option<Arc<dyn ExecMonitor<()>>>,
    ) -> Result<Submission<()>>
    where
        R: Runnable + 'static,
    {
        self.exec_with_result(body, (), monitor)
    }

    /// Run a side-effect-only unit of work that resolves to `result`
    pub fn exec_with_result<R, O>(
        &self,
        body: R,
        result: O,
        monitor: Option<Arc<dyn ExecMonitor<O>>>,
    ) -> Result<Submission<O>>
    where
        R: Runnable + 'static,
        O: Send + 'static,
    {
        self.submit(
            WorkItem::Plain {
                body: Box::new(body),
                result,
            },
            monitor,
        )
    }

    /// Run one invocation; resolves to its result
    pub fn invoke<I, T>(
        &self,
        invocation: I,
        monitor: Option<Arc<dyn ExecMonitor<T>>>,
    ) -> Result<Submission<T>>
    where
        I: Invocation<T> + 'static,
        T: Send + 'static,
    {
        self.submit(WorkItem::Single(Box::new(invocation)), monitor)
    }

    /// Run a chain, collecting every result in order
    pub fn exec_chain<T>(
        &self,
        chain: InvocationChain<T>,
        monitor: Option<Arc<dyn ExecMonitor<Vec<T>>>>,
    ) -> Result<Submission<Vec<T>>>
    where
        T: Send + 'static,
    {
        let assembler = ListAssembler::with_capacity(chain.len());
        self.exec_chain_with(chain, monitor, assembler)
    }

    /// Run a chain, folding its results with `assembler`
    pub fn exec_chain_with<T, A>(
        &self,
        chain: InvocationChain<T>,
        monitor: Option<Arc<dyn ExecMonitor<A::Output>>>,
        assembler: A,
    ) -> Result<Submission<A::Output>>
    where
        T: 'static,
        A: ResultAssembler<T> + 'static,
        A::Output: Send + 'static,
    {
        let assembly = ChainAssembly::new(chain.into_links(), assembler);
        self.submit(WorkItem::Chain(Box::new(assembly)), monitor)
    }

    /// Drive a multi-step task, collecting every partial result in order
    pub fn exec_task<K, T>(
        &self,
        task: K,
        monitor: Option<Arc<dyn ExecMonitor<Vec<T>>>>,
    ) -> Result<Submission<Vec<T>>>
    where
        K: MultiStepTask<T> + 'static,
        T: Send + 'static,
    {
        self.exec_task_with(task, monitor, ListAssembler::new())
    }

    /// Drive a multi-step task, folding its partial results with `assembler`
    pub fn exec_task_with<K, T, A>(
        &self,
        task: K,
        monitor: Option<Arc<dyn ExecMonitor<A::Output>>>,
        assembler: A,
    ) -> Result<Submission<A::Output>>
    where
        K: MultiStepTask<T> + 'static,
        T: 'static,
        A: ResultAssembler<T> + 'static,
        A::Output: Send + 'static,
    {
        let assembly = TaskAssembly::new(Box::new(task), assembler);
        self.submit(WorkItem::MultiStep(Box::new(assembly)), monitor)
    }

    fn submit<O>(
        &self,
        item: WorkItem<O>,
        monitor: Option<Arc<dyn ExecMonitor<O>>>,
    ) -> Result<Submission<O>>
    where
        O: Send + 'static,
    {
        let books = &self.inner.books;
        if !self.inner.accepting.load(Ordering::Acquire) {
            books.metrics.record_rejected();
            warn!(kind = item.kind(), "Submission rejected: processor shut down");
            return Err(CmdError::ShutDown);
        }

        let ticket = Arc::new(Ticket::new());
        let id = ticket.id();
        let kind = item.kind();
        let future = CmdFuture::new();
        let execution = Execution {
            ticket: Arc::clone(&ticket),
            monitor,
            future: future.clone(),
            books: Arc::clone(books),
        };

        books.in_flight.lock().insert(id, Arc::clone(&ticket));
        let job: Job = Box::new(move || execution.run(item));
        if !self.inner.queue.push(job) {
            books.in_flight.lock().remove(&id);
            books.metrics.record_rejected();
            if self.inner.queue.is_closed() {
                warn!(kind, "Submission rejected: processor shut down");
                return Err(CmdError::ShutDown);
            }
            let capacity = self.inner.queue.capacity();
            warn!(kind, capacity, "Submission rejected: queue full");
            return Err(CmdError::QueueFull { capacity });
        }

        books.metrics.record_submitted();
        debug!(id = %id, kind, "Submission queued");
        Ok(Submission { ticket, future })
    }

    /// Request cancellation of an in-flight submission.
    ///
    /// Takes effect at the next step boundary. Returns `false` if `id` is
    /// unknown or already finished.
    pub fn cancel(&self, id: SubmissionId) -> bool {
        let ticket = self.inner.books.in_flight.lock().get(&id).cloned();
        match ticket {
            Some(ticket) => {
                debug!(id = %id, "Cancellation requested");
                ticket.request_cancel()
            }
            None => false,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.books.metrics.snapshot()
    }

    /// Submissions waiting for a worker
    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }

    /// Submissions accepted and not yet terminal
    pub fn in_flight(&self) -> usize {
        self.inner.books.in_flight.lock().len()
    }

    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        !self.inner.accepting.load(Ordering::Acquire)
    }

    /// Stop accepting work, let queued items finish, and join the workers.
    ///
    /// Safe to call more than once. When called from a worker thread that
    /// thread is not joined.
    pub fn shutdown(&self) {
        if self.inner.accepting.swap(false, Ordering::AcqRel) {
            info!(queued = self.queued(), "Command processor shutting down");
        }
        self.inner.queue.close();

        let handles = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    }
}

impl Drop for CmdProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for CmdProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdProcessor")
            .field("workers", &self.config.workers)
            .field("queued", &self.queued())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn worker_loop(index: usize, inner: Arc<Inner>) {
    debug!(worker = index, "Worker started");
    while let Some(job) = inner.queue.pop() {
        job();
    }
    debug!(worker = index, "Worker stopped");
}

/// Handle to one accepted submission
pub struct Submission<O> {
    ticket: Arc<Ticket>,
    future: CmdFuture<O>,
}

impl<O> Submission<O> {
    pub fn id(&self) -> SubmissionId {
        self.ticket.id()
    }

    pub fn state(&self) -> ExecState {
        self.ticket.state()
    }

    /// Request cancellation; see [`CmdProcessor::cancel`]
    pub fn cancel(&self) -> bool {
        self.ticket.request_cancel()
    }

    /// Shared handle to the result
    pub fn future(&self) -> CmdFuture<O> {
        self.future.clone()
    }

    pub fn is_done(&self) -> bool {
        self.future.is_done()
    }
}

impl<O: Clone> Submission<O> {
    /// Block until the item reaches a terminal state
    pub fn get(&self) -> Result<O> {
        self.future.get()
    }

    pub fn get_timeout(&self, timeout: Duration) -> Option<Result<O>> {
        self.future.get_timeout(timeout)
    }
}

impl<O> fmt::Debug for Submission<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
