use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::agent::{discovery, AgentRegistry};
use crate::cache;
use crate::config::OrchestratorConfig;
use crate::engine::{executor::TaskRunner, ExecutionEngine};
use crate::error::{OrchestratorError, Result};
use crate::graph;
use crate::monitor::{BuildSummary, HeartbeatMonitor, ProgressReporter};
use crate::ninja::BuildTool;
use crate::scheduler::{plan_tasks, TaskQueue};

/// Build mode. Remote agents are only probed in distributed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Single,
    Distributed,
}

/// Top-level wiring for one build run.
///
/// Owns the shared registry and queue, and drives the phases in order:
/// discovery, graph ingestion, planning, concurrent execution with the
/// monitor loops, final summary.
pub struct Orchestrator {
    config: OrchestratorConfig,
    mode: BuildMode,
    tool: Arc<dyn BuildTool>,
    registry: Arc<RwLock<AgentRegistry>>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        mode: BuildMode,
        tool: Arc<dyn BuildTool>,
        shutdown: CancellationToken,
    ) -> Self {
        tracing::info!(mode = ?mode, "Orchestrator initialized");
        Self {
            config,
            mode,
            tool,
            registry: Arc::new(RwLock::new(AgentRegistry::new())),
            shutdown,
        }
    }

    pub fn registry(&self) -> Arc<RwLock<AgentRegistry>> {
        self.registry.clone()
    }

    /// Discover and register build agents.
    ///
    /// The local agent is always registered first; in distributed mode,
    /// remote agents are probed from the hosts file. Discovery failures are
    /// never fatal. Returns the number of known agents.
    pub async fn discover_agents(&self, hosts_file: Option<&Path>) -> usize {
        tracing::info!("Discovering build agents...");
        discovery::register_local_agent(&self.registry).await;

        if self.mode == BuildMode::Distributed {
            if let Some(hosts) = hosts_file {
                // Discovery errors are non-fatal; the local agent can still
                // carry the build.
                if let Err(e) = discovery::discover_from_hosts_file(&self.registry, hosts).await {
                    tracing::error!(hosts = %hosts.display(), error = %e, "Error reading hosts file");
                }
            } else {
                tracing::warn!("Distributed mode without a hosts file, using local agent only");
            }
        }

        let count = self.registry.read().await.len();
        tracing::info!(agents = count, "Agent discovery complete");
        count
    }

    /// Run one full build. Returns the summary, or an error when no usable
    /// build-tool output was found or the run was interrupted before any
    /// dispatch.
    pub async fn run_build(&self, build_dir: &Path) -> Result<BuildSummary> {
        let graph = graph::ingest(self.tool.as_ref(), build_dir).await?;

        if self.config.cache_enabled {
            cache::enable_compiler_cache(&self.config).await;
        }

        let tasks = plan_tasks(&graph, build_dir);
        let queue = Arc::new(RwLock::new(TaskQueue::new(tasks, self.config.max_retries)));

        // Monitors outlive the engine only until the run token is cancelled.
        let run_token = self.shutdown.child_token();

        let heartbeat = HeartbeatMonitor::new(
            self.registry.clone(),
            Duration::from_secs(self.config.heartbeat_interval.max(1)),
            run_token.clone(),
        );
        let heartbeat_handle = tokio::spawn(heartbeat.run());

        let reporter = ProgressReporter::new(queue.clone(), run_token.clone());
        let reporter_handle = tokio::spawn(reporter.run());

        let runner = TaskRunner::new(self.tool.clone());
        let engine = ExecutionEngine::new(
            queue.clone(),
            self.registry.clone(),
            runner,
            self.shutdown.clone(),
            self.config.max_parallel_jobs.max(1),
        );
        engine.run().await;

        run_token.cancel();
        let _ = heartbeat_handle.await;
        let _ = reporter_handle.await;

        let summary = {
            let queue = queue.read().await;
            BuildSummary::from_tasks(queue.completed_tasks(), queue.failed_len())
        };
        summary.log();

        if self.shutdown.is_cancelled() {
            return Err(OrchestratorError::Interrupted);
        }
        if summary.failed > 0 {
            return Err(OrchestratorError::BuildTool(format!(
                "{} task(s) failed permanently",
                summary.failed
            )));
        }
        Ok(summary)
    }
}
