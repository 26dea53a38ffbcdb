//! Workflow Model
//!
//! A named, append-only collection of tasks plus the dependency relation
//! declared between them.

use std::collections::HashMap;

use log::debug;
use uuid::Uuid;

use super::error::GraphError;
use super::graph::DependencyGraph;
use super::task::Task;

/// Name given to workflows created without one.
pub const DEFAULT_WORKFLOW_NAME: &str = "workflow";

/// A dependency graph of tasks.
///
/// Tasks keep their insertion order, which is also the tie-break used when
/// several tasks become runnable at the same time.
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Generated identifier of this graph instance
    pub id: String,

    /// Display label
    pub name: String,

    tasks: Vec<Task>,

    /// Dependency ids per task, captured when the task was added
    dependency_index: HashMap<String, Vec<String>>,
}

impl Workflow {
    /// Creates an empty workflow with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            name: if name.trim().is_empty() {
                DEFAULT_WORKFLOW_NAME.to_string()
            } else {
                name
            },
            tasks: Vec::new(),
            dependency_index: HashMap::new(),
        }
    }

    /// Creates a workflow from a list of tasks.
    pub fn from_tasks(name: impl Into<String>, tasks: Vec<Task>) -> Result<Self, GraphError> {
        let mut workflow = Self::new(name);
        for task in tasks {
            workflow.add_task(task)?;
        }
        Ok(workflow)
    }

    /// Appends a task and snapshots its declared dependencies.
    ///
    /// Dependencies are not checked here; they may be added later.
    pub fn add_task(&mut self, task: Task) -> Result<(), GraphError> {
        if self.dependency_index.contains_key(&task.id) {
            return Err(GraphError::DuplicateTask(task.id));
        }

        debug!(
            "Workflow '{}': adding task '{}' (deps: {:?})",
            self.name, task.id, task.dependencies
        );

        self.dependency_index
            .insert(task.id.clone(), task.dependencies.clone());
        self.tasks.push(task);
        Ok(())
    }

    /// Returns the tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Gets a task by id.
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Returns the dependency ids recorded for a task.
    pub fn dependencies_of(&self, id: &str) -> Option<&[String]> {
        self.dependency_index.get(id).map(Vec::as_slice)
    }

    /// Returns the position of a task in insertion order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Linearizes the tasks so every task follows all of its dependencies.
    ///
    /// # Errors
    ///
    /// * [`GraphError::MissingDependency`] - a dependency names no task
    /// * [`GraphError::CyclicDependency`] - the dependencies form a loop
    pub fn execution_order(&self) -> Result<Vec<Task>, GraphError> {
        let graph = DependencyGraph::build(self)?;
        Ok(graph
            .order()
            .iter()
            .map(|&index| self.tasks[index].clone())
            .collect())
    }

    /// Returns tasks with no declared dependencies.
    pub fn root_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.dependencies.is_empty())
            .collect()
    }

    /// Returns the number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the workflow has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(DEFAULT_WORKFLOW_NAME)
    }
}
