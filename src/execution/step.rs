//! Single Task Execution
//!
//! Runs one task through an executor, applying:
//! - Cooperative cancellation checks
//! - Per-task timeout on a worker thread
//! - Retry with exponential backoff for failed actions

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};

use super::error::TaskError;
use super::executor::{TaskExecutor, TaskScope};
use crate::workflow::{Context, Task};

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Timeout and retry settings for one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 0,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Executes a task, retrying failed actions up to `settings.max_retries` times.
///
/// # Returns
///
/// * `Ok(output)` - The task output returned by the executor
/// * `Err` - The last error once retries are exhausted, or the first error
///   that cannot be retried
pub fn run_task(
    task: &Task,
    context: &Context,
    executor: &Arc<dyn TaskExecutor>,
    scope: &TaskScope,
    settings: &StepSettings,
) -> Result<Context, TaskError> {
    let mut attempt: u32 = 0;

    loop {
        if scope.cancel.is_cancelled() {
            return Err(TaskError::Cancelled {
                task_id: task.id.clone(),
            });
        }

        match run_once(task, context, executor, scope, settings.timeout) {
            Ok(result) => return Ok(result),
            Err(err) if err.is_retryable() && attempt < settings.max_retries => {
                let delay = backoff_delay(settings.retry_backoff, attempt);
                attempt += 1;
                warn!(
                    "[{}] Task '{}' failed ({}); retry {}/{} in {:?}",
                    scope.execution_id, task.id, err, attempt, settings.max_retries, delay
                );
                thread::sleep(delay);
            }
            Err(TaskError::ActionFailed { task_id, source, .. }) => {
                return Err(TaskError::ActionFailed {
                    task_id,
                    attempts: attempt + 1,
                    source,
                });
            }
            Err(err) => return Err(err),
        }
    }
}

/// Backoff before retry number `attempt + 1`: `base * 2^attempt`, capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(1u32 << attempt.min(16))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

/// Runs the executor once, on a worker thread when a timeout applies.
///
/// A panicking executor is reported as [`TaskError::Panicked`] in both cases.
fn run_once(
    task: &Task,
    context: &Context,
    executor: &Arc<dyn TaskExecutor>,
    scope: &TaskScope,
    timeout: Option<Duration>,
) -> Result<Context, TaskError> {
    let Some(timeout) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| {
            executor.execute_task(task, context, scope)
        }))
        .unwrap_or_else(|_| {
            Err(TaskError::Panicked {
                task_id: task.id.clone(),
            })
        });
    };

    let (tx, rx) = channel();
    let worker_context = context.clone();
    let worker_task = task.clone();
    let worker_executor = Arc::clone(executor);
    let worker_scope = scope.clone();

    thread::spawn(move || {
        let result = worker_executor.execute_task(&worker_task, &worker_context, &worker_scope);
        if tx.send(result).is_err() {
            debug!(
                "Task '{}' finished after its run stopped waiting",
                worker_task.id
            );
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            error!(
                "[{}] Task '{}' timed out after {:?}; cancelling",
                scope.execution_id, task.id, timeout
            );
            scope.cancel.cancel();
            Err(TaskError::Timeout {
                task_id: task.id.clone(),
                timeout,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(TaskError::Panicked {
            task_id: task.id.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::executor::DirectExecutor;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn direct() -> Arc<dyn TaskExecutor> {
        Arc::new(DirectExecutor)
    }

    fn settings(timeout: Option<Duration>, max_retries: u32) -> StepSettings {
        StepSettings {
            timeout,
            max_retries,
            retry_backoff: Duration::from_millis(1),
        }
    }

    /// Task that fails the first `failures` times it runs.
    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> Task {
        Task::new("flaky", "Flaky").with_action(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(format!("failure {}", n).into())
            } else {
                let mut out = Context::new();
                out.insert("ok".to_string(), json!(n));
                Ok(out)
            }
        })
    }

    #[test]
    fn test_run_task_inline() {
        let task = Task::new("t", "T").with_action(|_| {
            let mut out = Context::new();
            out.insert("done".to_string(), json!(true));
            Ok(out)
        });
        let scope = TaskScope::new("wf", "exec");

        let out = run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 0)).unwrap();
        assert_eq!(out["done"], json!(true));
    }

    #[test]
    fn test_run_task_with_timeout_completes() {
        let task = Task::new("quick", "Quick").with_action(|_| Ok(Context::new()));
        let scope = TaskScope::new("wf", "exec");

        let result = run_task(
            &task,
            &Context::new(),
            &direct(),
            &scope,
            &settings(Some(Duration::from_secs(5)), 0),
        );
        assert!(result.is_ok());
        assert!(!scope.cancel.is_cancelled());
    }

    #[test]
    fn test_run_task_timeout_cancels() {
        let observed = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&observed);
        let task = Task::new("slow", "Slow").with_cancellable_action(move |_, cancel| {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            seen.store(1, Ordering::SeqCst);
            Ok(Context::new())
        });
        let scope = TaskScope::new("wf", "exec");

        let err = run_task(
            &task,
            &Context::new(),
            &direct(),
            &scope,
            &settings(Some(Duration::from_millis(30)), 3),
        )
        .unwrap_err();

        assert!(matches!(err, TaskError::Timeout { ref task_id, .. } if task_id == "slow"));
        assert!(scope.cancel.is_cancelled());

        // The worker notices the signal and exits on its own
        for _ in 0..100 {
            if observed.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = flaky(2, Arc::clone(&calls));
        let scope = TaskScope::new("wf", "exec");

        let out = run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 3)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(out["ok"], json!(2));
    }

    #[test]
    fn test_retry_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = flaky(10, Arc::clone(&calls));
        let scope = TaskScope::new("wf", "exec");

        let err = run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 2))
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            TaskError::ActionFailed { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "failure 2");
            }
            other => panic!("Expected ActionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_no_retry_without_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = flaky(1, Arc::clone(&calls));
        let scope = TaskScope::new("wf", "exec");

        assert!(run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 0)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_action_not_retried() {
        let scope = TaskScope::new("wf", "exec");
        let err = run_task(
            &Task::new("bare", "Bare"),
            &Context::new(),
            &direct(),
            &scope,
            &settings(None, 5),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::InvalidAction { .. }));
    }

    #[test]
    fn test_cancelled_scope_skips_task() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = flaky(0, Arc::clone(&calls));
        let scope = TaskScope::new("wf", "exec");
        scope.cancel.cancel();

        let err = run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 0))
            .unwrap_err();
        assert!(matches!(err, TaskError::Cancelled { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_panic_reported() {
        let task = Task::new("panics", "Panics").with_action(|_| panic!("worker blew up"));
        let scope = TaskScope::new("wf", "exec");

        let err = run_task(
            &task,
            &Context::new(),
            &direct(),
            &scope,
            &settings(Some(Duration::from_secs(5)), 0),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Panicked { .. }));
    }

    #[test]
    fn test_inline_panic_reported() {
        let task = Task::new("panics", "Panics").with_action(|_| panic!("inline blew up"));
        let scope = TaskScope::new("wf", "exec");

        let err = run_task(&task, &Context::new(), &direct(), &scope, &settings(None, 2))
            .unwrap_err();
        assert!(matches!(err, TaskError::Panicked { ref task_id } if task_id == "panics"));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
    }
}
