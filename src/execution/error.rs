//! Execution Errors

use std::time::Duration;

use thiserror::Error;

use crate::workflow::{ActionError, GraphError};

/// Failure of a single task.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid action for task '{task_id}': no action supplied")]
    InvalidAction { task_id: String },

    #[error("Task '{task_id}' failed after {attempts} attempt(s): {source}")]
    ActionFailed {
        task_id: String,
        attempts: u32,
        #[source]
        source: ActionError,
    },

    #[error("Task '{task_id}' timed out after {timeout:?}")]
    Timeout { task_id: String, timeout: Duration },

    #[error("Task '{task_id}' was cancelled")]
    Cancelled { task_id: String },

    #[error("Task '{task_id}' worker panicked")]
    Panicked { task_id: String },
}

impl TaskError {
    /// Returns the id of the task that failed.
    pub fn task_id(&self) -> &str {
        match self {
            Self::InvalidAction { task_id }
            | Self::ActionFailed { task_id, .. }
            | Self::Timeout { task_id, .. }
            | Self::Cancelled { task_id }
            | Self::Panicked { task_id } => task_id,
        }
    }

    /// Returns true if running the task again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ActionFailed { .. })
    }
}

/// Why a run failed.
#[derive(Error, Debug)]
pub enum FailureCause {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Failure of a whole workflow run.
#[derive(Error, Debug)]
#[error("Execution {execution_id} failed: {cause}")]
pub struct ExecutionFailure {
    pub execution_id: String,
    #[source]
    pub cause: FailureCause,
}

impl ExecutionFailure {
    pub fn new(execution_id: impl Into<String>, cause: impl Into<FailureCause>) -> Self {
        Self {
            execution_id: execution_id.into(),
            cause: cause.into(),
        }
    }

    /// Returns the failing task, if the run got as far as running tasks.
    pub fn task_id(&self) -> Option<&str> {
        match &self.cause {
            FailureCause::Task(err) => Some(err.task_id()),
            FailureCause::Graph(_) => None,
        }
    }
}
