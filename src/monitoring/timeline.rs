//! Execution Timeline
//!
//! Records when each task of one run starts and finishes, for Gantt charts
//! and per-task timing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Started,
    Completed,
    Failed,
}

/// A single event in the timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub task_id: String,
    pub event_type: EventType,
    /// Time since the run started
    pub offset: Duration,
}

/// Timeline of one workflow run.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a task.
    pub fn record(&mut self, task_id: &str, event_type: EventType) {
        self.events.push(TimelineEvent {
            task_id: task_id.to_string(),
            event_type,
            offset: self.start_time.elapsed(),
        });
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns `(start, end)` offsets in milliseconds for every task that
    /// finished, ordered by start.
    pub fn spans(&self) -> Vec<(String, u128, u128)> {
        let mut starts: HashMap<&str, u128> = HashMap::new();
        let mut spans = Vec::new();

        for event in &self.events {
            let at = event.offset.as_millis();
            match event.event_type {
                EventType::Started => {
                    starts.insert(&event.task_id, at);
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(&start) = starts.get(event.task_id.as_str()) {
                        spans.push((event.task_id.clone(), start, at));
                    }
                }
            }
        }

        spans.sort_by_key(|(_, start, _)| *start);
        spans
    }

    /// Task durations in milliseconds.
    pub fn durations(&self) -> HashMap<String, u128> {
        self.spans()
            .into_iter()
            .map(|(id, start, end)| (id, end - start))
            .collect()
    }

    /// Renders an ASCII Gantt chart, 50 columns wide.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let spans = self.spans();
        let total_time = spans
            .iter()
            .map(|(_, _, end)| *end)
            .max()
            .unwrap_or(0)
            .max(self.elapsed().as_millis());

        if total_time == 0 {
            return output;
        }

        let scale = 50.0 / total_time as f64;

        for (task_id, start, end) in spans {
            let start_pos = (start as f64 * scale) as usize;
            let width = ((end - start) as f64 * scale).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&"#".repeat(width));

            output.push_str(&format!(
                "{} |{:<50}| ({} ms)\n",
                truncate(&task_id, 12),
                bar,
                end - start
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Pads or truncates to exactly `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.events().is_empty());
        assert!(timeline.durations().is_empty());
    }

    #[test]
    fn test_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.record("fetch", EventType::Started);
        thread::sleep(Duration::from_millis(30));
        timeline.record("fetch", EventType::Completed);

        let durations = timeline.durations();
        assert!(durations["fetch"] >= 30);
    }

    #[test]
    fn test_unfinished_task_has_no_span() {
        let mut timeline = ExecutionTimeline::new();
        timeline.record("stuck", EventType::Started);

        assert!(timeline.spans().is_empty());
        assert_eq!(timeline.events().len(), 1);
    }

    #[test]
    fn test_failed_task_has_span() {
        let mut timeline = ExecutionTimeline::new();
        timeline.record("bad", EventType::Started);
        timeline.record("bad", EventType::Failed);

        assert_eq!(timeline.events()[1].event_type, EventType::Failed);
        assert!(timeline.durations().contains_key("bad"));
    }

    #[test]
    fn test_spans_sorted_by_start() {
        let mut timeline = ExecutionTimeline::new();
        timeline.record("first", EventType::Started);
        thread::sleep(Duration::from_millis(5));
        timeline.record("second", EventType::Started);
        timeline.record("second", EventType::Completed);
        timeline.record("first", EventType::Completed);

        let ids: Vec<_> = timeline.spans().into_iter().map(|(id, _, _)| id).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_gantt_chart() {
        let mut timeline = ExecutionTimeline::new();
        timeline.record("step1", EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.record("step1", EventType::Completed);
        timeline.record("a-very-long-task-name", EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.record("a-very-long-task-name", EventType::Completed);

        let chart = timeline.gantt_chart();
        assert!(chart.contains("step1"));
        assert!(chart.contains("a-very-lo..."));
        assert!(chart.contains("Total:"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc  ");
        assert_eq!(truncate("abcdefgh", 6), "abc...");
    }
}
