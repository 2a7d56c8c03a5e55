//! Execution engine: a pool of workers that pull ready tasks, reserve
//! agents, run builds, and resolve the results.

pub mod executor;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;

use crate::agent::AgentRegistry;
use crate::scheduler::{TaskQueue, TaskStatus};

use executor::TaskRunner;

/// Backoff while waiting for a task to become ready. The `task_ready` notify
/// normally wakes workers sooner; the sleep is a fallback bound.
const TASK_WAIT: Duration = Duration::from_millis(100);
/// Longer backoff while waiting for an agent to free up.
const AGENT_WAIT: Duration = Duration::from_millis(500);

/// Drives tasks to completion using available agents.
pub struct ExecutionEngine {
    queue: Arc<RwLock<TaskQueue>>,
    registry: Arc<RwLock<AgentRegistry>>,
    runner: TaskRunner,
    stop: CancellationToken,
    /// Signalled when a task completes or is requeued, so blocked workers
    /// rescan the pending list.
    task_ready: Arc<Notify>,
    /// Signalled when an agent is released.
    agent_free: Arc<Notify>,
    max_workers: usize,
}

impl ExecutionEngine {
    pub fn new(
        queue: Arc<RwLock<TaskQueue>>,
        registry: Arc<RwLock<AgentRegistry>>,
        runner: TaskRunner,
        stop: CancellationToken,
        max_workers: usize,
    ) -> Self {
        Self {
            queue,
            registry,
            runner,
            stop,
            task_ready: Arc::new(Notify::new()),
            agent_free: Arc::new(Notify::new()),
            max_workers,
        }
    }

    /// Run the worker pool until the queue drains or the stop token fires.
    ///
    /// Pool size is `min(agent count, task count)`, capped by the configured
    /// parallelism. A dispatched task always runs to completion; the stop
    /// token only prevents new dispatches.
    pub async fn run(self) {
        let agents = self.registry.read().await.len();
        let tasks = self.queue.read().await.pending_len();
        let workers = agents.min(tasks).min(self.max_workers).max(1);
        tracing::info!(workers, agents, tasks, "Starting build execution");

        let engine = Arc::new(self);
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.worker_loop(worker_id).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker panicked");
            }
        }
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            if self.stop.is_cancelled() {
                break;
            }

            let task = { self.queue.write().await.take_ready() };
            let Some(mut task) = task else {
                {
                    let mut queue = self.queue.write().await;
                    if queue.is_drained() {
                        break;
                    }
                    if queue.is_stalled() {
                        let drained = queue.drain_stalled();
                        tracing::error!(
                            tasks = drained.len(),
                            "Remaining tasks permanently blocked, draining"
                        );
                        drop(queue);
                        self.task_ready.notify_waiters();
                        break;
                    }
                }
                // Blocked: wait for a completion to unlock dependents.
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = self.task_ready.notified() => {}
                    _ = tokio::time::sleep(TASK_WAIT) => {}
                }
                continue;
            };

            let agent = { self.registry.write().await.reserve_best(&task.target) };
            let Some(agent) = agent else {
                {
                    self.queue.write().await.push_back(task);
                }
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = self.agent_free.notified() => {}
                    _ = tokio::time::sleep(AGENT_WAIT) => {}
                }
                continue;
            };

            tracing::info!(
                worker_id,
                target = %task.target,
                agent = %agent.name,
                "Executing task"
            );
            task.status = TaskStatus::Running;
            task.assigned_agent = Some(agent.name.clone());
            task.start_time = Some(chrono::Utc::now());

            let result = self.runner.execute(&task, &agent).await;
            task.end_time = Some(chrono::Utc::now());

            {
                self.registry.write().await.release(&agent.name);
            }
            self.agent_free.notify_waiters();

            if result.success {
                self.queue.write().await.complete(task);
            } else {
                if let Some(diag) = &result.diagnostics {
                    tracing::error!(target = %task.target, "Task failed: {}", diag.trim());
                }
                self.queue.write().await.requeue_failed(task);
            }
            // Wake blocked workers: a completion may unlock dependents, and
            // an exhausted retry budget may flip the queue to stalled.
            self.task_ready.notify_waiters();
        }
    }
}
