//! Tool Registry Module
//!
//! Reusable named actions that workflow files refer to by name.
//!
//! - [`registry`]: The registry itself and action construction
//! - [`builtin`]: Tools registered by default

pub mod builtin;
pub mod registry;

pub use builtin::DEFAULT_REGISTRY;
pub use registry::{Tool, ToolError, ToolFn, ToolInfo, ToolOutput, ToolRegistry};
