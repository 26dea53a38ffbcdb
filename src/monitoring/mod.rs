//! Monitoring Module
//!
//! - [`Metrics`]: Run counters shared across executions
//! - [`ExecutionTimeline`]: Task start/end timing of one run

pub mod metrics;
pub mod timeline;

pub use metrics::{Metrics, MetricsSnapshot};
pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
