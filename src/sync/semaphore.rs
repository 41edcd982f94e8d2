//! Counting semaphore with instrumented checkpoints.
//!
//! Every read and mutation of the counter goes through one lock. Observers
//! registered with [`Semaphore::register`] run on the thread performing the
//! `down`/`up`, while that lock is held, right before the counter changes.
//! They exist so tests can hold an operation mid-flight and check what a
//! concurrent reader sees.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point inside an operation at which observers are notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// `down` holds the lock and a permit is available; count not yet decremented
    DownLockAcquired,
    /// `up` holds the lock; count not yet incremented
    UpLockAcquired,
}

type Observer = Arc<dyn Fn(Checkpoint) + Send + Sync>;

struct State {
    count: usize,
    observers: Vec<Observer>,
}

impl State {
    fn notify(&self, checkpoint: Checkpoint) {
        for observer in &self.observers {
            observer(checkpoint);
        }
    }
}

pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                count,
                observers: Vec::new(),
            }),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is available, then take it
    pub fn down(&self) {
        let mut state = self.state.lock();
        while state.count == 0 {
            self.available.wait(&mut state);
        }
        state.notify(Checkpoint::DownLockAcquired);
        state.count -= 1;
    }

    /// Like [`down`](Self::down) but gives up after `timeout`.
    ///
    /// Returns `true` if a permit was taken.
    pub fn down_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.count == 0 {
            if self.available.wait_until(&mut state, deadline).timed_out() && state.count == 0 {
                return false;
            }
        }
        state.notify(Checkpoint::DownLockAcquired);
        state.count -= 1;
        true
    }

    /// Take a permit if one is available without blocking
    pub fn try_down(&self) -> bool {
        let mut state = self.state.lock();
        if state.count == 0 {
            return false;
        }
        state.notify(Checkpoint::DownLockAcquired);
        state.count -= 1;
        true
    }

    /// Release a permit and wake one waiter
    pub fn up(&self) {
        let mut state = self.state.lock();
        state.notify(Checkpoint::UpLockAcquired);
        state.count += 1;
        self.available.notify_one();
    }

    /// Current number of permits
    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    /// Add an observer.
    ///
    /// Observers run with the internal lock held and must not call back into
    /// this semaphore.
    pub fn register<F>(&self, observer: F)
    where
        F: Fn(Checkpoint) + Send + Sync + 'static,
    {
        self.state.lock().observers.push(Arc::new(observer));
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Semaphore")
            .field("count", &state.count)
            .field("observers", &state.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_basic_operations() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.count(), 2);

        sem.down();
        assert_eq!(sem.count(), 1);
        assert!(sem.try_down());
        assert_eq!(sem.count(), 0);
        assert!(!sem.try_down());

        sem.up();
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn test_count_is_stable() {
        let sem = Semaphore::new(3);
        let reads: Vec<usize> = (0..10).map(|_| sem.count()).collect();
        assert!(reads.iter().all(|&c| c == 3));
    }

    #[test]
    fn test_down_timeout_expires() {
        let sem = Semaphore::new(0);
        let start = Instant::now();
        assert!(!sem.down_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_down_timeout_acquires_after_up() {
        let sem = Arc::new(Semaphore::new(0));
        let releaser = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                sem.up();
            })
        };

        assert!(sem.down_timeout(Duration::from_secs(5)));
        releaser.join().unwrap();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_down_blocks_until_up() {
        let sem = Arc::new(Semaphore::new(0));
        let acquired = Arc::new(AtomicUsize::new(0));

        let waiter = {
            let sem = Arc::clone(&sem);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                sem.down();
                acquired.fetch_add(1, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert_eq!(acquired.load(Ordering::SeqCst), 0);

        sem.up();
        waiter.join().unwrap();
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observers_see_checkpoints() {
        let sem = Semaphore::new(1);
        let downs = Arc::new(AtomicUsize::new(0));
        let ups = Arc::new(AtomicUsize::new(0));
        {
            let downs = Arc::clone(&downs);
            let ups = Arc::clone(&ups);
            sem.register(move |cp| match cp {
                Checkpoint::DownLockAcquired => {
                    downs.fetch_add(1, Ordering::SeqCst);
                }
                Checkpoint::UpLockAcquired => {
                    ups.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        sem.down();
        sem.up();
        sem.up();
        assert!(!Semaphore::new(0).try_down());

        assert_eq!(downs.load(Ordering::SeqCst), 1);
        assert_eq!(ups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_producers_consumers() {
        let sem = Arc::new(Semaphore::new(0));
        let consumed = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..4 {
            let sem = Arc::clone(&sem);
            let consumed = Arc::clone(&consumed);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    sem.down();
                    consumed.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for _ in 0..4 {
            let sem = Arc::clone(&sem);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    sem.up();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(consumed.load(Ordering::SeqCst), 200);
        assert_eq!(sem.count(), 0);
    }
}
