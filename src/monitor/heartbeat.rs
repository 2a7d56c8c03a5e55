use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentRegistry;

/// Periodically re-evaluates agent liveness.
///
/// The local agent is always refreshed; a remote agent silent for three
/// intervals is demoted to unavailable (and can recover on a later
/// heartbeat). Demotion does not rescue an in-flight task.
pub struct HeartbeatMonitor {
    registry: Arc<RwLock<AgentRegistry>>,
    interval: Duration,
    stop: CancellationToken,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: Arc<RwLock<AgentRegistry>>,
        interval: Duration,
        stop: CancellationToken,
    ) -> Self {
        Self {
            registry,
            interval,
            stop,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so a fresh registry is
        // not swept before any heartbeat could arrive.
        ticker.tick().await;

        let stale_after = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {
                    self.registry
                        .write()
                        .await
                        .mark_stale(chrono::Utc::now(), stale_after);
                }
            }
        }
    }
}
