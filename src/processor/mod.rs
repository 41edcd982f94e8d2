//! The command processor: worker pool, ready queue and per-submission engine.

pub mod cmd_processor;
mod engine;
pub mod ready_queue;
pub mod servant;
pub mod ticket;

pub use cmd_processor::{CmdProcessor, Submission};
pub use ready_queue::ReadyQueue;
pub use servant::Servant;
pub use ticket::{ExecState, SubmissionId};
