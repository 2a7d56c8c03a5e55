use std::collections::HashSet;

use crate::scheduler::task::{Task, TaskStatus};

/// Result of returning a failed task to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Task went back to pending at its decayed priority.
    Requeued,
    /// Retry budget exhausted; task is terminally failed.
    Exhausted,
}

/// Pending/completed task state for one build run.
///
/// Held behind a lock by the engine. Every read-then-write scheduling
/// decision is a single method so two workers can never claim the same task.
/// The pending list is kept sorted descending by priority.
#[derive(Debug)]
pub struct TaskQueue {
    pending: Vec<Task>,
    completed: Vec<Task>,
    failed: Vec<Task>,
    completed_targets: HashSet<String>,
    /// Tasks handed to a worker but not yet resolved.
    in_flight: usize,
    max_retries: u32,
}

impl TaskQueue {
    /// Build a queue from a planned task list (already priority-ordered).
    pub fn new(mut tasks: Vec<Task>, max_retries: u32) -> Self {
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            pending: tasks,
            completed: Vec::new(),
            failed: Vec::new(),
            completed_targets: HashSet::new(),
            in_flight: 0,
            max_retries,
        }
    }

    /// Remove and return the highest-priority task whose dependencies are all
    /// completed.
    ///
    /// Dependencies on terminally-failed targets can never be satisfied, so
    /// tasks blocked on them stay pending until the engine drains. Returns
    /// `None` when nothing is ready (remaining tasks blocked, or list empty).
    pub fn take_ready(&mut self) -> Option<Task> {
        let idx = self.pending.iter().position(|task| {
            task.dependencies
                .iter()
                .all(|dep| self.completed_targets.contains(dep))
        })?;
        let task = self.pending.remove(idx);
        self.in_flight += 1;
        Some(task)
    }

    /// Return a task the engine could not place on any agent. Priority is
    /// unchanged.
    pub fn push_back(&mut self, mut task: Task) {
        task.status = TaskStatus::Pending;
        task.assigned_agent = None;
        self.in_flight = self.in_flight.saturating_sub(1);
        self.insert_sorted(task);
    }

    /// Record a successful execution.
    pub fn complete(&mut self, mut task: Task) {
        task.status = TaskStatus::Completed;
        self.in_flight = self.in_flight.saturating_sub(1);
        self.completed_targets.insert(task.target.clone());
        self.completed.push(task);
    }

    /// Record a failed execution: halve the priority (integer floor) and
    /// requeue, or park the task as terminally failed once its attempts
    /// exceed the retry budget.
    pub fn requeue_failed(&mut self, mut task: Task) -> RequeueOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        task.attempts += 1;
        task.priority /= 2;
        task.assigned_agent = None;

        if task.attempts >= self.max_retries {
            tracing::error!(
                target = %task.target,
                attempts = task.attempts,
                "Task failed permanently, retry budget exhausted"
            );
            task.status = TaskStatus::Failed;
            self.failed.push(task);
            return RequeueOutcome::Exhausted;
        }

        tracing::warn!(
            target = %task.target,
            attempts = task.attempts,
            priority = task.priority,
            "Task failed, requeued at reduced priority"
        );
        task.status = TaskStatus::Pending;
        self.insert_sorted(task);
        RequeueOutcome::Requeued
    }

    fn insert_sorted(&mut self, task: Task) {
        // Insert after equal priorities so a requeued task does not overtake
        // same-priority peers.
        let pos = self
            .pending
            .partition_point(|t| t.priority >= task.priority);
        self.pending.insert(pos, task);
    }

    /// True when no task is pending and no worker holds an unresolved task.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }

    /// True when pending tasks remain but none can ever become ready: no
    /// worker holds a task, and every pending task waits on an incomplete
    /// dependency. Completion only moves forward, so this state is permanent.
    pub fn is_stalled(&self) -> bool {
        self.in_flight == 0
            && !self.pending.is_empty()
            && !self.pending.iter().any(|task| {
                task.dependencies
                    .iter()
                    .all(|dep| self.completed_targets.contains(dep))
            })
    }

    /// Move every permanently-blocked pending task to the failed list.
    /// Returns the targets drained.
    pub fn drain_stalled(&mut self) -> Vec<String> {
        let mut drained = Vec::with_capacity(self.pending.len());
        for mut task in self.pending.drain(..) {
            tracing::error!(
                target = %task.target,
                "Task blocked on a dependency that will never complete"
            );
            task.status = TaskStatus::Failed;
            drained.push(task.target.clone());
            self.failed.push(task);
        }
        drained
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    pub fn failed_tasks(&self) -> &[Task] {
        &self.failed
    }

    pub fn is_completed(&self, target: &str) -> bool {
        self.completed_targets.contains(target)
    }
}
