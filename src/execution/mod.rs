//! Workflow Execution Module
//!
//! Runs validated workflows and reports their outcome.
//!
//! # Architecture
//!
//! - [`engine`]: The [`Orchestrator`] driving a run
//! - [`scheduler`]: Bounded-parallel ready-queue scheduling
//! - [`step`]: Single-task execution with timeout and retry
//! - [`executor`]: Pluggable strategies for running one task
//! - [`config`]: Orchestrator settings

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod result;
pub mod scheduler;
pub mod step;

pub use config::{ExecutionMode, OrchestratorConfig};
pub use engine::Orchestrator;
pub use error::{ExecutionFailure, FailureCause, TaskError};
pub use executor::{merge_into, AgentExecutor, DirectExecutor, TaskExecutor, TaskScope};
pub use result::ExecutionResult;
pub use step::StepSettings;
