use crate::sync::Semaphore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

enum Taken<T> {
    Item(T),
    Closed,
    Stale,
}

struct Slots<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded FIFO feeding the worker pool.
///
/// The item deque and the closed flag sit behind one lock; a [`Semaphore`]
/// counts pushed items so that consumers block in `pop` instead of polling.
/// After `close`, remaining items are still handed out and `pop` returns
/// `None` once the queue is drained.
pub struct ReadyQueue<T> {
    slots: Mutex<Slots<T>>,
    available: Semaphore,
    capacity: usize,
}

impl<T> ReadyQueue<T> {
    /// Creates a new ReadyQueue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Semaphore::new(0),
            capacity,
        }
    }

    /// Attempts to push an item onto the queue.
    /// Returns false if the queue is at capacity or closed; never blocks.
    pub fn push(&self, item: T) -> bool {
        {
            let mut slots = self.slots.lock();
            if slots.closed || slots.items.len() >= self.capacity {
                return false;
            }
            slots.items.push_back(item);
        }
        self.available.up();
        true
    }

    /// Blocks until an item is available; `None` once closed and drained
    pub fn pop(&self) -> Option<T> {
        loop {
            self.available.down();
            match self.take() {
                Taken::Item(item) => return Some(item),
                Taken::Closed => return None,
                Taken::Stale => continue,
            }
        }
    }

    /// Like `pop` but gives up after `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !self.available.down_timeout(remaining) {
                return None;
            }
            match self.take() {
                Taken::Item(item) => return Some(item),
                Taken::Closed => return None,
                Taken::Stale => continue,
            }
        }
    }

    /// Pops an item if one is immediately available
    pub fn try_pop(&self) -> Option<T> {
        while self.available.try_down() {
            match self.take() {
                Taken::Item(item) => return Some(item),
                Taken::Closed => return None,
                Taken::Stale => continue,
            }
        }
        None
    }

    // Called with one permit held. An empty deque means either a `clear`
    // left a stale permit or the close token was taken; the close token is
    // handed on so every blocked consumer wakes up.
    fn take(&self) -> Taken<T> {
        let mut slots = self.slots.lock();
        if let Some(item) = slots.items.pop_front() {
            return Taken::Item(item);
        }
        if slots.closed {
            drop(slots);
            self.available.up();
            Taken::Closed
        } else {
            Taken::Stale
        }
    }

    /// Stop accepting items and wake blocked consumers
    pub fn close(&self) {
        {
            let mut slots = self.slots.lock();
            if slots.closed {
                return;
            }
            slots.closed = true;
        }
        self.available.up();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }

    /// Returns the current number of items in the queue
    pub fn len(&self) -> usize {
        self.slots.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all queued items
    pub fn clear(&self) {
        self.slots.lock().items.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }
}
