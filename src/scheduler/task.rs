use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One build target plus its dependency set and scheduling state.
#[derive(Debug, Clone)]
pub struct Task {
    /// Target name, unique within a run.
    pub target: String,
    /// Build directory the target is built in.
    pub directory: PathBuf,
    pub dependencies: BTreeSet<String>,
    pub priority: i64,
    pub status: TaskStatus,
    /// Name of the agent executing this task. Set only while running.
    pub assigned_agent: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Execution attempts so far, counted up by the retry path.
    pub attempts: u32,
}

impl Task {
    pub fn new(target: String, directory: PathBuf, dependencies: BTreeSet<String>) -> Self {
        Self {
            target,
            directory,
            dependencies,
            priority: 0,
            status: TaskStatus::Pending,
            assigned_agent: None,
            start_time: None,
            end_time: None,
            attempts: 0,
        }
    }

    /// Wall-clock duration of the last execution, if both timestamps are set.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
