//! Orchestrator Configuration
//!
//! Settings can be given in the `settings:` block of a workflow file and
//! overridden from the command line.
//!
//! ```yaml
//! settings:
//!   mode: parallel
//!   max_parallel: 4
//!   timeout_ms: 5000
//!   max_retries: 2
//!   retry_backoff_ms: 50
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-task timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default delay before the first retry in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// How tasks of one run are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One task at a time, in execution order
    #[default]
    Sequential,
    /// Ready tasks run on up to `max_parallel` worker threads
    Parallel,
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Whether runs update the metrics counters
    pub enable_metrics: bool,

    /// Extra attempts for a task whose action fails
    pub max_retries: u32,

    /// Delay before the first retry; doubles on every further attempt
    pub retry_backoff_ms: u64,

    /// Per-task timeout; `None` or `0` disables it
    pub timeout_ms: Option<u64>,

    /// Scheduling mode
    pub mode: ExecutionMode,

    /// Worker limit for parallel mode
    pub max_parallel: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            max_retries: 0,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            mode: ExecutionMode::Sequential,
            max_parallel: num_cpus::get(),
        }
    }
}

impl OrchestratorConfig {
    /// Switches to parallel mode with the given worker limit.
    pub fn parallel(mut self, max_parallel: usize) -> Self {
        self.mode = ExecutionMode::Parallel;
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Switches to sequential mode.
    pub fn sequential(mut self) -> Self {
        self.mode = ExecutionMode::Sequential;
        self
    }

    /// Sets the per-task timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Sets the retry budget and initial backoff.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Enables or disables metrics collection.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    /// Returns the effective per-task timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Returns the delay before the first retry.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OrchestratorConfig::default();

        assert!(config.enable_metrics);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout(), Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)));
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert!(config.max_parallel >= 1);
    }

    #[test]
    fn test_config_builders() {
        let config = OrchestratorConfig::default()
            .parallel(0)
            .with_timeout(None)
            .with_retries(3, Duration::from_millis(10))
            .with_metrics(false);

        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff(), Duration::from_millis(10));
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = OrchestratorConfig {
            timeout_ms: Some(0),
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_config_from_yaml_partial() {
        let config: OrchestratorConfig =
            serde_yaml::from_str("mode: parallel\nmax_parallel: 3\nmax_retries: 2\n").unwrap();

        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.max_parallel, 3);
        assert_eq!(config.max_retries, 2);
        assert!(config.enable_metrics);
        assert_eq!(config.timeout_ms, Some(DEFAULT_TIMEOUT_MS));
    }
}
