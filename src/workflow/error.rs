//! Workflow Errors
//!
//! Errors raised while building a workflow graph or loading a workflow file.

use thiserror::Error;

/// Structural problems with a workflow's dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task '{0}' already exists in the workflow")]
    DuplicateTask(String),

    #[error("Task '{task_id}' depends on unknown task '{missing_id}'")]
    MissingDependency { task_id: String, missing_id: String },

    #[error("Cyclic dependency between tasks: {}", members.join(", "))]
    CyclicDependency { members: Vec<String> },
}

/// Errors raised while loading a workflow definition file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read workflow file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Workflow has no tasks")]
    EmptyWorkflow,

    #[error("Task at position {0} has an empty id")]
    EmptyTaskId(usize),

    #[error("Task '{task_id}' uses unknown tool '{tool}'")]
    UnknownTool { task_id: String, tool: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
