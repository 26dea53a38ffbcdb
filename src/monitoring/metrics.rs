//! Execution Metrics
//!
//! Run counters shared by every `execute` call on one orchestrator. Counters
//! are plain atomics so snapshots can be taken while runs are in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate run counters.
#[derive(Debug, Default)]
pub struct Metrics {
    total_executions: AtomicU64,
    successful_executions: AtomicU64,
    failed_executions: AtomicU64,
    /// Milliseconds, summed over successful runs only
    total_execution_time: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_execution_time: u64,
    pub average_execution_time: u64,
    pub timestamp: DateTime<Utc>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a run as started.
    pub fn record_start(&self) {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a successful run and adds its duration.
    pub fn record_success(&self, duration: Duration) {
        self.successful_executions.fetch_add(1, Ordering::Relaxed);
        self.total_execution_time
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Counts a failed run. Its duration is not added.
    pub fn record_failure(&self) {
        self.failed_executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_executions = self.total_executions.load(Ordering::Relaxed);
        let successful_executions = self.successful_executions.load(Ordering::Relaxed);
        let failed_executions = self.failed_executions.load(Ordering::Relaxed);
        let total_execution_time = self.total_execution_time.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_executions,
            successful_executions,
            failed_executions,
            total_execution_time,
            average_execution_time: average(total_execution_time, successful_executions),
            timestamp: Utc::now(),
        }
    }
}

/// Mean rounded half away from zero, or 0 when nothing succeeded.
fn average(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();

        assert_eq!(snapshot.total_executions, 0);
        assert_eq!(snapshot.successful_executions, 0);
        assert_eq!(snapshot.failed_executions, 0);
        assert_eq!(snapshot.average_execution_time, 0);
    }

    #[test]
    fn test_average_rounds() {
        let metrics = Metrics::new();
        for ms in [10, 20, 31] {
            metrics.record_start();
            metrics.record_success(Duration::from_millis(ms));
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_execution_time, 61);
        // 61 / 3 = 20.33
        assert_eq!(snapshot.average_execution_time, 20);

        metrics.record_start();
        metrics.record_success(Duration::from_millis(1));
        // 62 / 4 = 15.5
        assert_eq!(metrics.snapshot().average_execution_time, 16);
    }

    #[test]
    fn test_failure_time_not_counted() {
        let metrics = Metrics::new();
        metrics.record_start();
        metrics.record_success(Duration::from_millis(40));
        metrics.record_start();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_executions, 2);
        assert_eq!(snapshot.successful_executions, 1);
        assert_eq!(snapshot.failed_executions, 1);
        assert_eq!(snapshot.total_execution_time, 40);
        assert_eq!(snapshot.average_execution_time, 40);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let metrics = Metrics::new();
        metrics.record_start();
        metrics.record_success(Duration::from_millis(5));

        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(value["totalExecutions"], json!(1));
        assert_eq!(value["successfulExecutions"], json!(1));
        assert_eq!(value["failedExecutions"], json!(0));
        assert_eq!(value["totalExecutionTime"], json!(5));
        assert_eq!(value["averageExecutionTime"], json!(5));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(Metrics::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_start();
                        metrics.record_success(Duration::from_millis(1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_executions, 800);
        assert_eq!(snapshot.successful_executions, 800);
        assert_eq!(snapshot.total_execution_time, 800);
    }
}
