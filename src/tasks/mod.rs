//! Work-unit abstractions and the contracts used to observe and combine them.

pub mod assembler;
pub mod invocation;
pub mod monitor;
pub mod multi_step;

pub use assembler::{FoldAssembler, LastAssembler, ListAssembler, ResultAssembler};
pub use invocation::{Invocation, InvocationChain, Runnable};
pub use monitor::{ExecMonitor, LogMonitor};
pub use multi_step::{MultiStepTask, Step, StepFn};
