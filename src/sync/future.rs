//! Single-assignment result handle.
//!
//! A [`CmdFuture`] is written once by the producer (normally a worker thread)
//! and read any number of times from any thread. Reads either block
//! ([`get`](CmdFuture::get)) or await: the handle implements
//! [`std::future::Future`], so async callers can race it against a timer.

use crate::core::errors::{CmdError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

struct Slot<T> {
    value: Option<Result<T>>,
    wakers: Vec<Waker>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

pub struct CmdFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CmdFuture<T> {
    /// Create an unset future
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value: None,
                    wakers: Vec::new(),
                }),
                ready: Condvar::new(),
            }),
        }
    }

    /// Create a future that is already set
    pub fn ready(result: Result<T>) -> Self {
        let future = Self::new();
        future.set(result);
        future
    }

    /// Store the result and wake every waiter.
    ///
    /// # Panics
    ///
    /// If the future was already set. Writing twice is a programming error.
    pub fn set(&self, result: Result<T>) {
        if !self.try_set(result) {
            panic!("CmdFuture::set called on a future that is already set");
        }
    }

    /// Store the result unless one is already present
    pub(crate) fn try_set(&self, result: Result<T>) -> bool {
        let wakers = {
            let mut slot = self.shared.slot.lock();
            if slot.value.is_some() {
                return false;
            }
            slot.value = Some(result);
            std::mem::take(&mut slot.wakers)
        };
        self.shared.ready.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.shared.slot.lock().value.is_some()
    }
}

impl<T: Clone> CmdFuture<T> {
    /// Block until the result is set and return it
    pub fn get(&self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.as_ref() {
                return value.clone();
            }
            self.shared.ready.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`; `None` if the result is still unset
    pub fn get_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.as_ref() {
                return Some(value.clone());
            }
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                return slot.value.clone();
            }
        }
    }

    /// Return the result if it is already set
    pub fn try_get(&self) -> Option<Result<T>> {
        self.shared.slot.lock().value.clone()
    }
}

impl<T> Clone for CmdFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for CmdFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CmdFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdFuture")
            .field("done", &self.is_done())
            .finish()
    }
}

impl<T: Clone> std::future::Future for CmdFuture<T> {
    type Output = std::result::Result<T, CmdError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        if let Some(value) = slot.value.as_ref() {
            return Poll::Ready(value.clone());
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
