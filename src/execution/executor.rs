//! Task Executors
//!
//! Strategies for running one task and folding its result into the
//! execution context. The orchestrator uses [`DirectExecutor`] unless the
//! caller hands it another implementation.
//!
//! Running and merging are separate steps so that a parallel run can replay
//! the merges in execution order and reach the same context as a sequential
//! one.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use super::error::TaskError;
use crate::memory::MemoryStore;
use crate::workflow::{CancelToken, Context, Task};

/// Identifies the run a task belongs to.
#[derive(Debug, Clone)]
pub struct TaskScope {
    pub workflow_id: String,
    pub execution_id: String,
    pub cancel: CancelToken,
}

impl TaskScope {
    pub fn new(workflow_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            cancel: CancelToken::new(),
        }
    }
}

/// Runs a task and decides how its result lands in the execution context.
pub trait TaskExecutor: Send + Sync {
    /// Runs `task` against `context` and returns the task's output.
    fn execute_task(
        &self,
        task: &Task,
        context: &Context,
        scope: &TaskScope,
    ) -> Result<Context, TaskError>;

    /// Folds the output of `task` into `context`.
    ///
    /// Must depend only on its arguments: parallel runs call it again for
    /// every view that includes `task`. Defaults to [`merge_into`].
    fn merge(&self, _task: &Task, context: &mut Context, output: Context) {
        merge_into(context, output);
    }
}

/// Shallow-merges `partial` into `context`; later keys win.
pub fn merge_into(context: &mut Context, partial: Context) {
    for (key, value) in partial {
        context.insert(key, value);
    }
}

/// Runs the task's own action; its partial result is merged flat.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl TaskExecutor for DirectExecutor {
    fn execute_task(
        &self,
        task: &Task,
        context: &Context,
        scope: &TaskScope,
    ) -> Result<Context, TaskError> {
        task.run(context, &scope.cancel)
    }
}

/// Named delegate that runs tasks on behalf of a workflow and records every
/// task result in a memory store.
#[derive(Clone)]
pub struct AgentExecutor {
    name: String,
    memory: Option<Arc<MemoryStore>>,
}

impl AgentExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            memory: None,
        }
    }

    /// Records task results in `memory` under `(workflow_id, task_id)`.
    pub fn with_memory(mut self, memory: Arc<MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory(&self) -> Option<&Arc<MemoryStore>> {
        self.memory.as_ref()
    }
}

impl TaskExecutor for AgentExecutor {
    fn execute_task(
        &self,
        task: &Task,
        context: &Context,
        scope: &TaskScope,
    ) -> Result<Context, TaskError> {
        debug!(
            "[{}] Agent '{}' running task '{}'",
            scope.execution_id, self.name, task.id
        );

        let partial = task.run(context, &scope.cancel)?;

        if let Some(memory) = &self.memory {
            memory.store(&scope.workflow_id, &task.id, Value::Object(partial.clone()));
        }

        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_returning(id: &str, key: &str, value: Value) -> Task {
        let key = key.to_string();
        Task::new(id, id).with_action(move |_| {
            let mut out = Context::new();
            out.insert(key.clone(), value.clone());
            Ok(out)
        })
    }

    #[test]
    fn test_merge_into_last_write_wins() {
        let mut ctx = Context::new();
        ctx.insert("a".to_string(), json!(1));
        ctx.insert("b".to_string(), json!(2));

        let mut partial = Context::new();
        partial.insert("a".to_string(), json!(3));
        merge_into(&mut ctx, partial);

        assert_eq!(Value::Object(ctx), json!({"a": 3, "b": 2}));
    }

    #[test]
    fn test_direct_executor_returns_partial_and_merges() {
        let scope = TaskScope::new("wf", "exec");
        let task = task_returning("t", "x", json!(1));
        let mut ctx = Context::new();
        ctx.insert("seed".to_string(), json!(true));

        let out = DirectExecutor.execute_task(&task, &ctx, &scope).unwrap();
        assert_eq!(Value::Object(out.clone()), json!({"x": 1}));

        DirectExecutor.merge(&task, &mut ctx, out);
        assert_eq!(Value::Object(ctx), json!({"seed": true, "x": 1}));
    }

    #[test]
    fn test_output_keeps_unchanged_values() {
        let scope = TaskScope::new("wf", "exec");
        let mut ctx = Context::new();
        ctx.insert("k".to_string(), json!(1));

        let out = DirectExecutor
            .execute_task(&task_returning("t", "k", json!(1)), &ctx, &scope)
            .unwrap();
        assert_eq!(Value::Object(out), json!({"k": 1}));
    }

    #[test]
    fn test_direct_executor_propagates_invalid_action() {
        let scope = TaskScope::new("wf", "exec");
        let err = DirectExecutor
            .execute_task(&Task::new("bare", "Bare"), &Context::new(), &scope)
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidAction { .. }));
    }

    #[test]
    fn test_agent_records_results() {
        let memory = Arc::new(MemoryStore::new());
        let agent = AgentExecutor::new("recorder").with_memory(Arc::clone(&memory));
        let scope = TaskScope::new("wf-1", "exec-1");

        let out = agent
            .execute_task(&task_returning("load", "rows", json!(10)), &Context::new(), &scope)
            .unwrap();

        assert_eq!(out["rows"], json!(10));
        let entry = memory.retrieve("wf-1", "load").unwrap();
        assert_eq!(entry.data, json!({"rows": 10}));
        assert_eq!(agent.name(), "recorder");
    }

    #[test]
    fn test_agent_without_memory() {
        let agent = AgentExecutor::new("plain");
        let scope = TaskScope::new("wf", "exec");

        let out = agent
            .execute_task(&task_returning("t", "k", json!("v")), &Context::new(), &scope)
            .unwrap();
        assert_eq!(out["k"], json!("v"));
        assert!(agent.memory().is_none());
    }

    #[test]
    fn test_agent_does_not_record_failures() {
        let memory = Arc::new(MemoryStore::new());
        let agent = AgentExecutor::new("recorder").with_memory(Arc::clone(&memory));
        let scope = TaskScope::new("wf", "exec");
        let failing = Task::new("bad", "Bad").with_action(|_| Err("nope".into()));

        assert!(agent.execute_task(&failing, &Context::new(), &scope).is_err());
        assert!(memory.retrieve("wf", "bad").is_none());
    }
}
