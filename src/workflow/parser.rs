//! Workflow Parser
//!
//! Loads workflow definitions from YAML. Each task names a registered tool
//! and the parameters to call it with; the tool becomes the task's action.
//!
//! ```yaml
//! name: report
//! settings:
//!   mode: parallel
//! input:
//!   data: hello
//! tasks:
//!   - id: fetch
//!     tool: fetch_data
//!     params: { url: "https://example.com" }
//!   - id: shout
//!     tool: transform_data
//!     params: { operation: uppercase }
//!     dependencies: [fetch]
//! ```

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::LoadError;
use super::graph::DependencyGraph;
use super::model::Workflow;
use super::task::{Context, Task};
use crate::execution::OrchestratorConfig;
use crate::tools::ToolRegistry;

/// Workflow file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub name: Option<String>,

    /// Orchestrator settings for this workflow
    #[serde(default)]
    pub settings: Option<OrchestratorConfig>,

    /// Initial execution context
    #[serde(default)]
    pub input: Context,

    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

/// One task entry of a workflow file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub tool: String,

    #[serde(default)]
    pub params: Value,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A workflow ready to execute, with the settings and input from its file.
#[derive(Debug)]
pub struct LoadedWorkflow {
    pub workflow: Workflow,
    pub config: OrchestratorConfig,
    pub input: Context,
}

impl WorkflowDefinition {
    /// Builds the workflow, resolving tools from `registry`.
    ///
    /// The dependency graph is validated here so a broken file fails before
    /// any task runs.
    pub fn build(self, registry: &ToolRegistry) -> Result<LoadedWorkflow, LoadError> {
        if self.tasks.is_empty() {
            return Err(LoadError::EmptyWorkflow);
        }

        let mut workflow = Workflow::new(self.name.unwrap_or_default());

        for (position, def) in self.tasks.into_iter().enumerate() {
            let id = def.id.trim().to_string();
            if id.is_empty() {
                return Err(LoadError::EmptyTaskId(position));
            }

            let action = registry
                .action(&def.tool, def.params)
                .map_err(|_| LoadError::UnknownTool {
                    task_id: id.clone(),
                    tool: def.tool.clone(),
                })?;

            debug!("Task '{}' uses tool '{}'", id, def.tool);

            let task = Task::new(id, def.name.unwrap_or_default())
                .with_dependencies(def.dependencies)
                .with_shared_action(action);
            workflow.add_task(task)?;
        }

        DependencyGraph::build(&workflow)?;

        Ok(LoadedWorkflow {
            workflow,
            config: self.settings.unwrap_or_default(),
            input: self.input,
        })
    }
}

/// Parses a workflow definition from YAML text.
pub fn parse_workflow(yaml: &str, registry: &ToolRegistry) -> Result<LoadedWorkflow, LoadError> {
    let definition: WorkflowDefinition = serde_yaml::from_str(yaml)?;
    let loaded = definition.build(registry)?;

    info!(
        "Parsed workflow '{}' with {} tasks",
        loaded.workflow.name,
        loaded.workflow.len()
    );
    Ok(loaded)
}

/// Loads a workflow definition from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use taskweave::tools::DEFAULT_REGISTRY;
/// use taskweave::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let loaded = load_workflow("pipeline.yaml", &DEFAULT_REGISTRY)?;
///     println!("Loaded {} tasks", loaded.workflow.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(
    path: impl AsRef<Path>,
    registry: &ToolRegistry,
) -> Result<LoadedWorkflow, LoadError> {
    let path = path.as_ref();
    info!("Loading workflow from: {}", path.display());

    let yaml = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!("YAML content loaded ({} bytes)", yaml.len());

    parse_workflow(&yaml, registry)
}
