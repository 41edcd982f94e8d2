//! Processor metrics collection
//!
//! Counters are updated by worker threads with relaxed atomics; a snapshot is
//! a consistent-enough view for reporting, not a linearizable one.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Submission and execution counters for one processor
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    /// Submissions accepted onto the queue
    pub submitted: AtomicU64,
    /// Submissions refused (queue full or shut down)
    pub rejected: AtomicU64,
    /// Work items that ended with `on_end`
    pub completed: AtomicU64,
    /// Work items that ended with `on_abort`
    pub failed: AtomicU64,
    /// Work items that ended with `on_cancel`
    pub cancelled: AtomicU64,
    /// Total running time across finished items
    pub total_execution_time_ms: AtomicU64,
}

impl ProcessorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, elapsed: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.add_time(elapsed);
    }

    pub fn record_failed(&self, elapsed: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.add_time(elapsed);
    }

    pub fn record_cancelled(&self, elapsed: Duration) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        self.add_time(elapsed);
    }

    fn add_time(&self, elapsed: Duration) {
        self.total_execution_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let total_time = self.total_execution_time_ms.load(Ordering::Relaxed);
        let finished = completed + failed + cancelled;

        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed,
            failed,
            cancelled,
            total_execution_time_ms: total_time,
            avg_execution_time_ms: if finished == 0 { 0 } else { total_time / finished },
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total_execution_time_ms: u64,
    pub avg_execution_time_ms: u64,
}

impl MetricsSnapshot {
    /// Items that reached a terminal state
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }

    /// Items accepted but not yet terminal
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.finished())
    }

    /// Calculate success rate (0.0 to 1.0) over finished items
    pub fn success_rate(&self) -> f64 {
        match self.finished() {
            0 => 0.0,
            n => self.completed as f64 / n as f64,
        }
    }

    /// Calculate failure rate (0.0 to 1.0) over finished items
    pub fn failure_rate(&self) -> f64 {
        match self.finished() {
            0 => 0.0,
            n => self.failed as f64 / n as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ProcessorMetrics::new();

        for _ in 0..4 {
            metrics.record_submitted();
        }
        metrics.record_completed(Duration::from_millis(100));
        metrics.record_completed(Duration::from_millis(200));
        metrics.record_failed(Duration::from_millis(60));
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submitted, 4);
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.total_execution_time_ms, 360);
        assert_eq!(snapshot.avg_execution_time_ms, 120);
        assert_eq!(snapshot.in_flight(), 1);
    }

    #[test]
    fn test_rates() {
        let metrics = ProcessorMetrics::new();
        assert_eq!(metrics.snapshot().success_rate(), 0.0);

        metrics.record_completed(Duration::ZERO);
        metrics.record_completed(Duration::ZERO);
        metrics.record_completed(Duration::ZERO);
        metrics.record_cancelled(Duration::ZERO);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.success_rate(), 0.75);
        assert_eq!(snapshot.failure_rate(), 0.0);
    }
}
