//! Workflow Definition Module
//!
//! Tasks, workflows and the dependency analysis that orders them.
//!
//! # Structure
//!
//! - [`task`]: The unit of work and its action
//! - [`model`]: Workflows as insertion-ordered task collections
//! - [`graph`]: Dependency validation and execution order
//! - [`planner`]: Ready-queue bookkeeping for parallel runs
//! - [`parser`]: YAML workflow files

pub mod error;
pub mod graph;
pub mod model;
pub mod parser;
pub mod planner;
pub mod task;

pub use error::{GraphError, LoadError};
pub use graph::DependencyGraph;
pub use model::Workflow;
pub use parser::{load_workflow, parse_workflow, LoadedWorkflow, TaskDefinition, WorkflowDefinition};
pub use planner::{ExecutionPlanner, TaskStatus};
pub use task::{Action, ActionError, CancelToken, Context, Task};
