//! # cmdexec: asynchronous command execution
//!
//! Runs potentially long or blocking work off the calling thread while
//! reporting progress, assembling multi-step results, and supporting
//! cooperative cancellation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cmdexec::{CmdProcessor, ProcessorConfig, StepFn};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = CmdProcessor::new(ProcessorConfig::development())?;
//!
//!     let task = StepFn::new(3, |step: usize| -> anyhow::Result<String> {
//!         Ok(format!("part {}", step))
//!     });
//!     let submission = processor.exec_task(task, None)?;
//!
//!     let parts = submission.get()?;
//!     assert_eq!(parts.len(), 3);
//!     Ok(())
//! }
//! ```

// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
    pub mod metrics;
}

pub mod processor; // Worker pool, queue and execution engine
pub mod sync; // Semaphore and single-assignment future
pub mod tasks; // Work units, monitors and assemblers

// Re-exports for convenience
pub use core::config::{ProcessorConfig, ProcessorConfigBuilder};
pub use core::errors::{CmdError, ConfigError, Result, StartError};
pub use core::metrics::MetricsSnapshot;
pub use processor::{CmdProcessor, ExecState, ReadyQueue, Servant, Submission, SubmissionId};
pub use sync::{Checkpoint, CmdFuture, Semaphore};
pub use tasks::{
    ExecMonitor, FoldAssembler, Invocation, InvocationChain, LastAssembler, ListAssembler,
    LogMonitor, MultiStepTask, ResultAssembler, Runnable, Step, StepFn,
};
