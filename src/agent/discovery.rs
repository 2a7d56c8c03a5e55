use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::agent::probe;
use crate::agent::registry::{Agent, AgentRegistry, LOCAL_HOST};
use crate::config::{host_cores, DEFAULT_AGENT_PORT};
use crate::error::Result;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Register the local machine as a build agent.
///
/// The local agent is always registered first so it wins reservation ties
/// against equally-sized remote agents.
pub async fn register_local_agent(registry: &Arc<RwLock<AgentRegistry>>) {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let cores = host_cores();
    let memory = available_memory_mb();

    let agent = Agent::new(
        format!("{}-local", host),
        LOCAL_HOST.to_string(),
        DEFAULT_AGENT_PORT,
        cores,
        memory,
    );
    registry.write().await.register(agent);
}

/// Discover remote agents from a hosts file.
///
/// One `host [port]` entry per line; blank lines and `#` comments are
/// skipped. A failed probe is logged and does not abort discovery of the
/// remaining hosts.
pub async fn discover_from_hosts_file(
    registry: &Arc<RwLock<AgentRegistry>>,
    hosts_file: &Path,
) -> Result<()> {
    let contents = std::fs::read_to_string(hosts_file)?;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(host) = parts.next() else { continue };
        let port = parts
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_AGENT_PORT);

        match probe::probe_agent(host, port, PROBE_TIMEOUT).await {
            Ok(agent) => registry.write().await.register(agent),
            Err(e) => {
                tracing::warn!(host, port, error = %e, "Skipping unreachable agent");
            }
        }
    }

    Ok(())
}

/// Available system memory in MB. Falls back to 8 GB if detection fails.
fn available_memory_mb() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") {
            for line in meminfo.lines() {
                if line.starts_with("MemAvailable") {
                    if let Some(kb) = line.split_whitespace().nth(1).and_then(|v| v.parse::<u64>().ok()) {
                        return kb / 1024;
                    }
                }
            }
        }
    }
    8192
}
