//! TaskWeave - Dependency-Aware Task Orchestration
//!
//! Runs named tasks in dependency order, threading an accumulating JSON
//! context from one task to the next and keeping run metrics.
//!
//! # Architecture
//!
//! - [`workflow`]: Tasks, workflows, dependency ordering and YAML loading
//! - [`execution`]: The orchestrator, executors, timeout and retry
//! - [`monitoring`]: Run metrics and per-run timelines
//! - [`memory`]: Shared store of task results
//! - [`tools`]: Named tools that workflow files turn into task actions
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use taskweave::{Context, Orchestrator, Task, Workflow};
//!
//! let mut workflow = Workflow::new("report");
//! workflow
//!     .add_task(Task::new("load", "Load").with_action(|_| {
//!         let mut out = Context::new();
//!         out.insert("rows".to_string(), json!(3));
//!         Ok(out)
//!     }))
//!     .unwrap();
//! workflow
//!     .add_task(Task::new("count", "Count").depends_on("load").with_action(|ctx| {
//!         let mut out = Context::new();
//!         out.insert("summary".to_string(), json!(format!("{} rows", ctx["rows"])));
//!         Ok(out)
//!     }))
//!     .unwrap();
//!
//! let result = Orchestrator::default().execute(&workflow, None).unwrap();
//! assert_eq!(result.result["summary"], "3 rows");
//! ```

pub mod execution;
pub mod memory;
pub mod monitoring;
pub mod tools;
pub mod workflow;

// Re-export commonly used types
pub use execution::{
    ExecutionFailure, ExecutionResult, Orchestrator, OrchestratorConfig, TaskExecutor,
};
pub use memory::MemoryStore;
pub use monitoring::MetricsSnapshot;
pub use tools::ToolRegistry;
pub use workflow::{load_workflow, Context, Task, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "TaskWeave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "TaskWeave");
    }

    #[test]
    fn test_module_exports_task() {
        let task = Task::new("test", "Test").depends_on("other");
        assert_eq!(task.id, "test");
        assert_eq!(task.dependencies, vec!["other"]);
    }

    #[test]
    fn test_module_exports_workflow() {
        let workflow = Workflow::default();
        assert!(workflow.is_empty());
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
