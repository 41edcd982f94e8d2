//! Synchronization primitives used by the processor and exposed to callers.

pub mod future;
pub mod semaphore;

pub use future::CmdFuture;
pub use semaphore::{Checkpoint, Semaphore};
