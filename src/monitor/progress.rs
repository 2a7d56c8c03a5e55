use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{Task, TaskQueue};

/// Reporting cadence.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);
/// Log whenever progress advanced at least this many percentage points.
const REPORT_STEP: f64 = 5.0;

/// Periodically logs completion percentage and a linear ETA.
pub struct ProgressReporter {
    queue: Arc<RwLock<TaskQueue>>,
    stop: CancellationToken,
}

impl ProgressReporter {
    pub fn new(queue: Arc<RwLock<TaskQueue>>, stop: CancellationToken) -> Self {
        Self { queue, stop }
    }

    pub async fn run(self) {
        let start = tokio::time::Instant::now();
        let total = {
            let queue = self.queue.read().await;
            queue.pending_len() + queue.in_flight() + queue.completed_len()
        };
        let mut last_progress = 0.0_f64;
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let completed = self.queue.read().await.completed_len();
            let progress = if total > 0 {
                completed as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            if progress - last_progress >= REPORT_STEP || (progress > 0.0 && last_progress == 0.0) {
                let elapsed = start.elapsed().as_secs_f64();
                let eta = (elapsed / progress) * (100.0 - progress);
                tracing::info!(
                    "Build progress: {:.1}% ({}/{}), ETA: {:.1}s",
                    progress,
                    completed,
                    total,
                    eta
                );
                last_progress = progress;
            }
        }
    }
}

/// Aggregates computed over the completed task list at the end of a run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub completed: usize,
    pub failed: usize,
    /// Sum of individual task durations, not the wall-clock span.
    pub total_duration_secs: f64,
    pub average_duration_secs: f64,
    pub slowest_task: Option<(String, f64)>,
    /// Aggregate busy seconds per agent name.
    pub agent_busy_secs: HashMap<String, f64>,
}

impl BuildSummary {
    pub fn from_tasks(completed: &[Task], failed_count: usize) -> Self {
        let mut summary = BuildSummary {
            completed: completed.len(),
            failed: failed_count,
            ..Default::default()
        };

        for task in completed {
            let Some(duration) = task.duration() else {
                continue;
            };
            let secs = duration.num_milliseconds() as f64 / 1000.0;
            summary.total_duration_secs += secs;

            match &summary.slowest_task {
                Some((_, slowest)) if *slowest >= secs => {}
                _ => summary.slowest_task = Some((task.target.clone(), secs)),
            }

            if let Some(agent) = &task.assigned_agent {
                *summary.agent_busy_secs.entry(agent.clone()).or_default() += secs;
            }
        }

        if summary.completed > 0 {
            summary.average_duration_secs = summary.total_duration_secs / summary.completed as f64;
        }
        summary
    }

    pub fn log(&self) {
        if self.completed == 0 {
            tracing::warn!("No tasks were completed in this build");
            return;
        }

        tracing::info!("===== Build Summary =====");
        tracing::info!("Total tasks completed: {}", self.completed);
        if self.failed > 0 {
            tracing::warn!("Tasks failed permanently: {}", self.failed);
        }
        tracing::info!("Total build duration: {:.2}s", self.total_duration_secs);
        tracing::info!("Average task duration: {:.2}s", self.average_duration_secs);
        if let Some((target, secs)) = &self.slowest_task {
            tracing::info!("Slowest task: {} ({:.2}s)", target, secs);
        }
        tracing::info!("Agent utilization:");
        for (agent, secs) in &self.agent_busy_secs {
            tracing::info!("  {}: {:.2}s", agent, secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn completed_task(target: &str, agent: &str, start_ms: i64, end_ms: i64) -> Task {
        let mut task = Task::new(target.to_string(), PathBuf::from("build"), BTreeSet::new());
        task.assigned_agent = Some(agent.to_string());
        task.start_time = Some(Utc.timestamp_millis_opt(start_ms).unwrap());
        task.end_time = Some(Utc.timestamp_millis_opt(end_ms).unwrap());
        task
    }

    #[test]
    fn summary_aggregates_durations() {
        let tasks = vec![
            completed_task("a", "local", 0, 1_000),
            completed_task("b", "local", 1_000, 4_000),
            completed_task("c", "remote", 0, 2_000),
        ];
        let summary = BuildSummary::from_tasks(&tasks, 0);

        assert_eq!(summary.completed, 3);
        assert!((summary.total_duration_secs - 6.0).abs() < 1e-9);
        assert!((summary.average_duration_secs - 2.0).abs() < 1e-9);
        assert_eq!(summary.slowest_task, Some(("b".to_string(), 3.0)));
        assert!((summary.agent_busy_secs["local"] - 4.0).abs() < 1e-9);
        assert!((summary.agent_busy_secs["remote"] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn summary_of_empty_run() {
        let summary = BuildSummary::from_tasks(&[], 0);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.average_duration_secs, 0.0);
        assert!(summary.slowest_task.is_none());
    }
}
