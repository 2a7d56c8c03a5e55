use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::ninja::BuildTool;
use crate::scheduler::Task;

/// Simulated duration of a remote build call.
const REMOTE_BUILD_DELAY: Duration = Duration::from_secs(1);

/// Result of one execution attempt.
#[derive(Debug)]
pub struct ExecutionResult {
    pub success: bool,
    /// Captured diagnostics on failure.
    pub diagnostics: Option<String>,
}

/// Executes one task on one reserved agent.
#[derive(Clone)]
pub struct TaskRunner {
    tool: Arc<dyn BuildTool>,
    remote_delay: Duration,
}

impl TaskRunner {
    pub fn new(tool: Arc<dyn BuildTool>) -> Self {
        Self {
            tool,
            remote_delay: REMOTE_BUILD_DELAY,
        }
    }

    /// Override the simulated remote delay. Used by tests.
    pub fn with_remote_delay(mut self, delay: Duration) -> Self {
        self.remote_delay = delay;
        self
    }

    /// Execute a task on the given agent.
    ///
    /// A local agent invokes the real build tool for exactly this target. A
    /// remote agent is a stand-in: the call is simulated with a fixed delay
    /// and always succeeds, pending a real remote-execution protocol.
    pub async fn execute(&self, task: &Task, agent: &Agent) -> ExecutionResult {
        if agent.is_local() {
            match self.tool.build(&task.directory, &task.target).await {
                Ok(outcome) => ExecutionResult {
                    success: outcome.success,
                    diagnostics: (!outcome.diagnostics.is_empty()).then_some(outcome.diagnostics),
                },
                Err(e) => ExecutionResult {
                    success: false,
                    diagnostics: Some(e.to_string()),
                },
            }
        } else {
            tracing::info!(
                target = %task.target,
                host = %agent.host,
                "Simulating remote execution"
            );
            tokio::time::sleep(self.remote_delay).await;
            ExecutionResult {
                success: true,
                diagnostics: None,
            }
        }
    }
}
