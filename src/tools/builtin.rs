//! Built-in Tools
//!
//! Small tools available to every workflow file without registration.

use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::registry::ToolRegistry;
use crate::workflow::{ActionError, Context};

/// Simulated latency of `fetch_data`.
const FETCH_DELAY: Duration = Duration::from_millis(100);

/// Shared registry holding the built-in tools.
pub static DEFAULT_REGISTRY: Lazy<ToolRegistry> = Lazy::new(ToolRegistry::with_builtins);

impl ToolRegistry {
    /// Creates a registry with the built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("fetch_data", fetch_data, "Fetch data from URL")
            .register("transform_data", transform_data, "Transform data");
        registry
    }
}

/// Pretends to fetch `params.url`.
fn fetch_data(params: &Value, _context: &Context) -> Result<Value, ActionError> {
    thread::sleep(FETCH_DELAY);

    let url = params.get("url").and_then(Value::as_str).unwrap_or("default");
    Ok(json!({ "data": format!("Fetched: {}", url) }))
}

/// Applies `params.operation` to `params.data`, or to `context.data` when no
/// data parameter is given.
fn transform_data(params: &Value, context: &Context) -> Result<Value, ActionError> {
    let data = params
        .get("data")
        .or_else(|| context.get("data"))
        .cloned()
        .unwrap_or(Value::Null);

    let result = match params.get("operation").and_then(Value::as_str) {
        Some("uppercase") => Value::String(serde_json::to_string(&data)?.to_uppercase()),
        Some("reverse") => Value::String(serde_json::to_string(&data)?.chars().rev().collect()),
        _ => data,
    };

    Ok(json!({ "result": result }))
}
