//! Concurrency tests for the Semaphore and CmdFuture primitives
//!
//! The checkpoint tests stop an operation while it holds the semaphore lock
//! and check what a concurrent `count()` reader sees once it gets in.

use cmdexec::{Checkpoint, CmdError, CmdFuture, Semaphore};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Reader = Arc<Mutex<Option<JoinHandle<Option<usize>>>>>;

/// Spawn one `count()` reader the first time `at` is reached
fn install_reader(sem: &Arc<Semaphore>, at: Checkpoint) -> Reader {
    let reader: Reader = Arc::new(Mutex::new(None));
    let fired = AtomicBool::new(false);
    let weak: Weak<Semaphore> = Arc::downgrade(sem);
    let slot = Arc::clone(&reader);

    sem.register(move |checkpoint| {
        if checkpoint != at || fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak = weak.clone();
        let handle = thread::spawn(move || weak.upgrade().map(|sem| sem.count()));
        // Give the reader time to block on the lock we are holding
        thread::sleep(Duration::from_millis(30));
        *slot.lock() = Some(handle);
    });
    reader
}

fn join_reader(reader: &Reader) -> Option<usize> {
    let handle = reader.lock().take().expect("checkpoint never reached");
    handle.join().unwrap()
}

#[test]
fn test_reader_during_down_sees_post_decrement_value() {
    let sem = Arc::new(Semaphore::new(1));
    let reader = install_reader(&sem, Checkpoint::DownLockAcquired);

    sem.down();

    assert_eq!(join_reader(&reader), Some(0));
    assert_eq!(sem.count(), 0);
}

#[test]
fn test_reader_during_up_sees_post_increment_value() {
    let sem = Arc::new(Semaphore::new(1));
    let reader = install_reader(&sem, Checkpoint::UpLockAcquired);

    sem.up();

    assert_eq!(join_reader(&reader), Some(2));
    assert_eq!(sem.count(), 2);
}

#[test]
fn test_down_from_other_thread_passes_checkpoint_once() {
    let sem = Arc::new(Semaphore::new(0));
    let reader = install_reader(&sem, Checkpoint::DownLockAcquired);

    let waiter = {
        let sem = Arc::clone(&sem);
        thread::spawn(move || sem.down())
    };
    thread::sleep(Duration::from_millis(20));
    sem.up();
    waiter.join().unwrap();

    assert_eq!(join_reader(&reader), Some(0));
}

#[test]
fn test_get_from_two_threads_returns_identical_values() {
    let future: CmdFuture<Vec<String>> = CmdFuture::new();
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let future = future.clone();
            thread::spawn(move || future.get().unwrap())
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    future.set(Ok(vec!["a".to_string(), "b".to_string()]));

    let values: Vec<Vec<String>> = readers.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(values[0], values[1]);
    assert_eq!(values[0], vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_error_is_shared_by_every_reader() {
    let future: CmdFuture<u32> = CmdFuture::new();
    future.set(Err(CmdError::work(anyhow::anyhow!("disk on fire"))));

    let first = future.get().unwrap_err();
    let second = future.clone().get().unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert!(first.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn test_timer_wins_against_unset_future() {
    let future: CmdFuture<u8> = CmdFuture::new();
    let outcome = tokio::time::timeout(Duration::from_millis(30), future.clone()).await;
    assert!(outcome.is_err());
    assert!(!future.is_done());
}

#[tokio::test]
async fn test_future_wins_against_timer() {
    let future: CmdFuture<u8> = CmdFuture::new();
    let producer = {
        let future = future.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            future.set(Ok(9));
        })
    };

    let outcome = tokio::time::timeout(Duration::from_secs(5), future).await;
    assert_eq!(outcome.unwrap().unwrap(), 9);
    producer.join().unwrap();
}
