//! Execution Planner
//!
//! Ready-queue bookkeeping for the parallel scheduler:
//! - In-degree tracking per task
//! - Insertion-ordered ready queue
//! - Parallel slot accounting
//! - Task status tracking

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use super::graph::DependencyGraph;

/// Status of a task during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// Waiting for dependencies
    Pending,
    /// Dependencies met, waiting for a worker slot
    Ready,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error message
    Failed(String),
}

/// Tracks which tasks may run next.
///
/// A task becomes ready once every task it depends on has completed. Ready
/// tasks are handed out in insertion order, never more than `max_parallel`
/// at a time.
pub struct ExecutionPlanner<'g> {
    graph: &'g DependencyGraph,
    remaining_deps: Vec<usize>,
    status: Vec<TaskStatus>,
    ready: BinaryHeap<Reverse<usize>>,
    running: usize,
    completed: usize,
    max_parallel: usize,
}

impl<'g> ExecutionPlanner<'g> {
    /// Creates a planner for a validated graph.
    ///
    /// `max_parallel` is clamped to at least one slot.
    pub fn new(graph: &'g DependencyGraph, max_parallel: usize) -> Self {
        let remaining_deps: Vec<usize> = (0..graph.len()).map(|i| graph.in_degree(i)).collect();
        let mut status = vec![TaskStatus::Pending; graph.len()];
        let mut ready = BinaryHeap::new();

        for (i, &degree) in remaining_deps.iter().enumerate() {
            if degree == 0 {
                status[i] = TaskStatus::Ready;
                ready.push(Reverse(i));
            }
        }

        debug!(
            "Planner created: {} tasks, {} initially ready, {} slots",
            graph.len(),
            ready.len(),
            max_parallel.max(1)
        );

        Self {
            graph,
            remaining_deps,
            status,
            ready,
            running: 0,
            completed: 0,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Takes as many ready tasks as there are free slots and marks them running.
    pub fn take_ready(&mut self) -> Vec<usize> {
        let mut taken = Vec::new();

        while self.running < self.max_parallel {
            let Some(Reverse(index)) = self.ready.pop() else {
                break;
            };
            self.status[index] = TaskStatus::Running;
            self.running += 1;
            taken.push(index);
        }

        taken
    }

    /// Marks a task completed and releases its dependents.
    ///
    /// Returns the dependents that became ready.
    pub fn mark_completed(&mut self, index: usize) -> Vec<usize> {
        if self.status[index] == TaskStatus::Running {
            self.running -= 1;
        }
        self.status[index] = TaskStatus::Completed;
        self.completed += 1;

        let mut released = Vec::new();
        for &dependent in self.graph.dependents(index) {
            self.remaining_deps[dependent] -= 1;
            if self.remaining_deps[dependent] == 0 {
                self.status[dependent] = TaskStatus::Ready;
                self.ready.push(Reverse(dependent));
                released.push(dependent);
            }
        }

        debug!(
            "Task '{}' completed, released {:?} ({} running)",
            self.graph.id(index),
            released
                .iter()
                .map(|&i| self.graph.id(i))
                .collect::<Vec<_>>(),
            self.running
        );

        released
    }

    /// Marks a task failed.
    pub fn mark_failed(&mut self, index: usize, error: impl Into<String>) {
        if self.status[index] == TaskStatus::Running {
            self.running -= 1;
        }
        self.status[index] = TaskStatus::Failed(error.into());
    }

    /// Returns the status of a task.
    pub fn status(&self, index: usize) -> &TaskStatus {
        &self.status[index]
    }

    /// Returns the number of tasks currently running.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Returns true while some task has not completed.
    pub fn has_work_remaining(&self) -> bool {
        self.completed < self.graph.len()
    }

    /// Returns the current progress as (completed, total).
    pub fn progress(&self) -> (usize, usize) {
        (self.completed, self.graph.len())
    }
}
