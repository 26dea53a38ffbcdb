//! Tool Registry
//!
//! Name-to-callable lookup used to build task actions from string names and
//! parameters (for example when loading a workflow file).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::workflow::{Action, ActionError, CancelToken, Context};

/// Callable behind a registered tool: `(params, context) -> value`.
pub type ToolFn = Arc<dyn Fn(&Value, &Context) -> Result<Value, ActionError> + Send + Sync>;

/// Errors raised by tool lookups and invocations.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool {tool} failed: {message}")]
    Failed { tool: String, message: String },
}

/// A registered tool.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    function: ToolFn,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Successful tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub success: bool,
    pub tool: String,
    pub result: Value,
}

/// Listing entry returned by [`ToolRegistry::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Registry of named tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        function: F,
        description: impl Into<String>,
    ) -> &mut Self
    where
        F: Fn(&Value, &Context) -> Result<Value, ActionError> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering tool '{}'", name);

        self.tools.insert(
            name.clone(),
            Tool {
                name,
                description: description.into(),
                function: Arc::new(function),
            },
        );
        self
    }

    /// Invokes a tool by name.
    pub fn execute(
        &self,
        name: &str,
        params: &Value,
        context: &Context,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let result = (tool.function)(params, context).map_err(|e| ToolError::Failed {
            tool: name.to_string(),
            message: e.to_string(),
        })?;

        Ok(ToolOutput {
            success: true,
            tool: name.to_string(),
            result,
        })
    }

    /// Builds a task action that invokes a tool with fixed parameters.
    ///
    /// Object results become the task's partial context; any other value is
    /// stored under `"result"`.
    pub fn action(&self, name: &str, params: Value) -> Result<Action, ToolError> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        Ok(Arc::new(
            move |context: &Context, _cancel: &CancelToken| -> Result<Context, ActionError> {
                let value = (tool.function)(&params, context).map_err(|e| {
                    Box::new(ToolError::Failed {
                        tool: tool.name.clone(),
                        message: e.to_string(),
                    }) as ActionError
                })?;

                Ok(match value {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Context::new();
                        map.insert("result".to_string(), other);
                        map
                    }
                })
            },
        ))
    }

    /// Gets a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Returns true if a tool is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Lists registered tools sorted by name.
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name.clone(),
                description: t.description.clone(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
