//! Parallel Scheduler
//!
//! Runs ready tasks on worker threads, at most `max_parallel` at once.
//! Completions come back over a channel and release dependents.
//!
//! Every task sees the run input with the outputs of its transitive
//! dependencies merged in, in execution order, through the executor's own
//! merge. The final context merges every output in execution order, so it
//! does not depend on which worker finished first and matches a sequential
//! run whenever each task reads only what its dependencies wrote.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info};

use super::error::TaskError;
use super::executor::{TaskExecutor, TaskScope};
use super::step::{run_task, StepSettings};
use crate::monitoring::{EventType, ExecutionTimeline};
use crate::workflow::{Context, DependencyGraph, ExecutionPlanner, Workflow};

type Completion = (usize, Result<Context, TaskError>);

/// Shared inputs of one parallel run.
pub struct ParallelRun<'a> {
    pub workflow: &'a Workflow,
    pub graph: &'a DependencyGraph,
    pub executor: &'a Arc<dyn TaskExecutor>,
    pub scope: &'a TaskScope,
    pub settings: &'a StepSettings,
    pub max_parallel: usize,
}

impl ParallelRun<'_> {
    /// Runs every task and returns the final context.
    ///
    /// Stops at the first failure: the run's cancel token is set and tasks
    /// still running are left to observe it.
    pub fn run(
        &self,
        input: Context,
        timeline: &mut ExecutionTimeline,
    ) -> Result<Context, TaskError> {
        let tasks = self.workflow.tasks();
        let mut position = vec![0; self.graph.len()];
        for (pos, &index) in self.graph.order().iter().enumerate() {
            position[index] = pos;
        }

        let mut planner = ExecutionPlanner::new(self.graph, self.max_parallel);
        let mut outputs: Vec<Option<Context>> = vec![None; self.graph.len()];
        let (tx, rx): (Sender<Completion>, Receiver<Completion>) = channel();

        while planner.has_work_remaining() {
            for index in planner.take_ready() {
                let task = tasks[index].clone();
                let view = self.view_for(index, &input, &outputs, &position);

                info!(
                    "[{}] Starting task '{}' ({})",
                    self.scope.execution_id, task.id, task.name
                );
                timeline.record(&task.id, EventType::Started);

                let tx = tx.clone();
                let executor = Arc::clone(self.executor);
                let scope = self.scope.clone();
                let settings = *self.settings;

                thread::spawn(move || {
                    let result = run_task(&task, &view, &executor, &scope, &settings);
                    if tx.send((index, result)).is_err() {
                        debug!("Run finished before task '{}' reported back", task.id);
                    }
                });
            }

            // A validated graph always has a running task here
            if planner.running() == 0 {
                break;
            }
            let Ok((index, result)) = rx.recv() else {
                break;
            };

            match result {
                Ok(output) => {
                    timeline.record(self.graph.id(index), EventType::Completed);
                    outputs[index] = Some(output);
                    planner.mark_completed(index);

                    let (done, total) = planner.progress();
                    debug!("[{}] Progress {}/{}", self.scope.execution_id, done, total);
                }
                Err(err) => {
                    error!(
                        "[{}] Task '{}' failed: {}",
                        self.scope.execution_id,
                        self.graph.id(index),
                        err
                    );
                    timeline.record(self.graph.id(index), EventType::Failed);
                    planner.mark_failed(index, err.to_string());
                    self.scope.cancel.cancel();
                    return Err(err);
                }
            }
        }

        let mut context = input;
        for &index in self.graph.order() {
            if let Some(output) = outputs[index].take() {
                self.executor.merge(&tasks[index], &mut context, output);
            }
        }
        Ok(context)
    }

    /// Run input plus the outputs of every ancestor, in execution order.
    fn view_for(
        &self,
        index: usize,
        input: &Context,
        outputs: &[Option<Context>],
        position: &[usize],
    ) -> Context {
        let mut ancestors: Vec<usize> = self.graph.ancestors(index).into_iter().collect();
        ancestors.sort_by_key(|&a| position[a]);

        let tasks = self.workflow.tasks();
        let mut view = input.clone();
        for ancestor in ancestors {
            if let Some(output) = &outputs[ancestor] {
                self.executor.merge(&tasks[ancestor], &mut view, output.clone());
            }
        }
        view
    }
}
