//! Task Definition
//!
//! The atomic unit of work: an identifier, a display name, the ids of the
//! tasks it depends on, and an action that turns the current execution
//! context into a partial result.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use taskweave::workflow::{CancelToken, Context, Task};
//!
//! let task = Task::new("greet", "Greet")
//!     .depends_on("load")
//!     .with_action(|_ctx: &Context| {
//!         let mut out = Context::new();
//!         out.insert("greeting".to_string(), json!("hello"));
//!         Ok(out)
//!     });
//!
//! let partial = task.run(&Context::new(), &CancelToken::new()).unwrap();
//! assert_eq!(partial["greeting"], "hello");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::execution::error::TaskError;

/// Accumulated key-value state threaded through a workflow run.
pub type Context = Map<String, Value>;

/// Error type returned by task actions.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Executable body of a task.
pub type Action = Arc<dyn Fn(&Context, &CancelToken) -> Result<Context, ActionError> + Send + Sync>;

/// Label used when a task is created without a name.
pub const DEFAULT_TASK_NAME: &str = "Unnamed Task";

/// Cooperative cancellation signal shared between the engine and actions.
///
/// Long-running actions should poll [`CancelToken::is_cancelled`] and return
/// early once it flips; the engine never kills a running action.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A single unit of work in a workflow.
#[derive(Clone)]
pub struct Task {
    /// Unique identifier within a workflow
    pub id: String,

    /// Display label
    pub name: String,

    /// IDs of tasks that must complete before this one runs
    pub dependencies: Vec<String>,

    action: Option<Action>,
}

impl Task {
    /// Creates a task with the given id and name and no action.
    ///
    /// An empty id is replaced by a generated UUID, an empty name by
    /// [`DEFAULT_TASK_NAME`].
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into().trim().to_string();
        let name = name.into().trim().to_string();

        Self {
            id: if id.is_empty() { Uuid::new_v4().to_string() } else { id },
            name: if name.is_empty() { DEFAULT_TASK_NAME.to_string() } else { name },
            dependencies: Vec::new(),
            action: None,
        }
    }

    /// Creates a task with a generated id.
    pub fn unnamed() -> Self {
        Self::new("", "")
    }

    /// Adds a dependency on another task.
    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    /// Replaces the dependency list.
    pub fn with_dependencies<I, S>(mut self, task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = task_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an action that ignores cancellation.
    pub fn with_action<F>(self, action: F) -> Self
    where
        F: Fn(&Context) -> Result<Context, ActionError> + Send + Sync + 'static,
    {
        self.with_cancellable_action(move |ctx, _| action(ctx))
    }

    /// Sets an action that receives the run's cancellation token.
    pub fn with_cancellable_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Context, &CancelToken) -> Result<Context, ActionError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Sets an already shared action.
    pub fn with_shared_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Returns true if an action was supplied.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Runs the action against the given context.
    ///
    /// # Errors
    ///
    /// * [`TaskError::InvalidAction`] - no action was supplied
    /// * [`TaskError::ActionFailed`] - the action returned an error
    pub fn run(&self, context: &Context, cancel: &CancelToken) -> Result<Context, TaskError> {
        let action = self.action.as_ref().ok_or_else(|| TaskError::InvalidAction {
            task_id: self.id.clone(),
        })?;

        action(context, cancel).map_err(|source| TaskError::ActionFailed {
            task_id: self.id.clone(),
            attempts: 1,
            source,
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}
