//! Workflow Orchestrator
//!
//! Runs a workflow from start to finish:
//! - Dependency validation and ordering
//! - Sequential or bounded-parallel scheduling
//! - Per-task timeout and retry
//! - Run metrics and logging

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use uuid::Uuid;

use crate::monitoring::{EventType, ExecutionTimeline, Metrics, MetricsSnapshot};
use crate::workflow::{Context, DependencyGraph, Workflow};

use super::config::{ExecutionMode, OrchestratorConfig};
use super::error::{ExecutionFailure, TaskError};
use super::executor::{DirectExecutor, TaskExecutor, TaskScope};
use super::result::ExecutionResult;
use super::scheduler::ParallelRun;
use super::step::{run_task, StepSettings};

/// Workflow orchestrator.
///
/// One orchestrator can serve many runs, including concurrent ones from
/// several threads; runs share nothing but the metrics counters.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use taskweave::execution::Orchestrator;
/// use taskweave::workflow::{Context, Task, Workflow};
///
/// let mut workflow = Workflow::new("greeting");
/// workflow
///     .add_task(Task::new("hello", "Hello").with_action(|_| {
///         let mut out = Context::new();
///         out.insert("message".to_string(), json!("hello"));
///         Ok(out)
///     }))
///     .unwrap();
///
/// let orchestrator = Orchestrator::default();
/// let result = orchestrator.execute(&workflow, None).unwrap();
///
/// assert_eq!(result.result["message"], "hello");
/// assert_eq!(orchestrator.metrics().successful_executions, 1);
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    metrics: Metrics,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        info!("Orchestrator initialized: {:?}", config);
        Self {
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs a workflow starting from an empty context.
    ///
    /// `None` runs each task's own action and merges its result.
    pub fn execute(
        &self,
        workflow: &Workflow,
        executor: Option<Arc<dyn TaskExecutor>>,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        self.execute_with_input(workflow, Context::new(), executor)
    }

    /// Runs a workflow starting from `input`.
    ///
    /// # Returns
    ///
    /// * `Ok(result)` - Every task completed; `result.result` is the final context
    /// * `Err(failure)` - The dependency graph was invalid or a task failed.
    ///   Tasks after the failing one never start.
    pub fn execute_with_input(
        &self,
        workflow: &Workflow,
        input: Context,
        executor: Option<Arc<dyn TaskExecutor>>,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let execution_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();

        if self.config.enable_metrics {
            self.metrics.record_start();
        }

        match self.run(workflow, input, executor, &execution_id) {
            Ok((result, timeline)) => {
                let elapsed = start_time.elapsed();
                if self.config.enable_metrics {
                    self.metrics.record_success(elapsed);
                }

                let duration = elapsed.as_millis() as u64;
                info!("[{}] Workflow execution completed in {} ms", execution_id, duration);

                Ok(ExecutionResult {
                    execution_id,
                    workflow_id: workflow.id.clone(),
                    duration,
                    result,
                    timeline,
                })
            }
            Err(failure) => {
                if self.config.enable_metrics {
                    self.metrics.record_failure();
                }
                error!("[{}] Workflow execution failed: {}", execution_id, failure.cause);
                Err(failure)
            }
        }
    }

    /// Returns a snapshot of the run counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn run(
        &self,
        workflow: &Workflow,
        input: Context,
        executor: Option<Arc<dyn TaskExecutor>>,
        execution_id: &str,
    ) -> Result<(Context, ExecutionTimeline), ExecutionFailure> {
        let graph =
            DependencyGraph::build(workflow).map_err(|e| ExecutionFailure::new(execution_id, e))?;

        info!(
            "[{}] Starting workflow execution: workflow {} ('{}'), {} tasks, {:?} mode",
            execution_id,
            workflow.id,
            workflow.name,
            graph.len(),
            self.config.mode
        );

        let executor =
            executor.unwrap_or_else(|| Arc::new(DirectExecutor) as Arc<dyn TaskExecutor>);
        let scope = TaskScope::new(&workflow.id, execution_id);
        let settings = self.step_settings();
        let mut timeline = ExecutionTimeline::new();

        let outcome = match self.config.mode {
            ExecutionMode::Sequential => run_sequential(
                workflow,
                &graph,
                input,
                &executor,
                &scope,
                &settings,
                &mut timeline,
            ),
            ExecutionMode::Parallel => ParallelRun {
                workflow,
                graph: &graph,
                executor: &executor,
                scope: &scope,
                settings: &settings,
                max_parallel: self.config.max_parallel,
            }
            .run(input, &mut timeline),
        };

        outcome
            .map(|context| (context, timeline))
            .map_err(|e| ExecutionFailure::new(execution_id, e))
    }

    fn step_settings(&self) -> StepSettings {
        StepSettings {
            timeout: self.config.timeout(),
            max_retries: self.config.max_retries,
            retry_backoff: self.config.retry_backoff(),
        }
    }
}

/// Runs tasks one at a time in execution order, merging each output before
/// the next task starts.
fn run_sequential(
    workflow: &Workflow,
    graph: &DependencyGraph,
    input: Context,
    executor: &Arc<dyn TaskExecutor>,
    scope: &TaskScope,
    settings: &StepSettings,
    timeline: &mut ExecutionTimeline,
) -> Result<Context, TaskError> {
    let tasks = workflow.tasks();
    let mut context = input;

    for &index in graph.order() {
        let task = &tasks[index];
        info!("[{}] Executing task '{}' ({})", scope.execution_id, task.id, task.name);
        timeline.record(&task.id, EventType::Started);

        match run_task(task, &context, executor, scope, settings) {
            Ok(output) => {
                executor.merge(task, &mut context, output);
                timeline.record(&task.id, EventType::Completed);
            }
            Err(err) => {
                timeline.record(&task.id, EventType::Failed);
                return Err(err);
            }
        }
    }

    Ok(context)
}
