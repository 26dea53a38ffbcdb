//! Execution Result

use serde::Serialize;

use crate::monitoring::ExecutionTimeline;
use crate::workflow::Context;

/// Outcome of a successful workflow run.
///
/// Serializes to `{"executionId", "workflowId", "duration", "result"}`; the
/// timeline stays in process.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: String,
    pub workflow_id: String,
    /// Wall-clock run time in milliseconds
    pub duration: u64,
    /// Final accumulated context
    pub result: Context,
    #[serde(skip)]
    pub timeline: ExecutionTimeline,
}
