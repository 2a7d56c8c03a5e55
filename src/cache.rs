use std::process::Stdio;

use tokio::process::Command;

use crate::config::OrchestratorConfig;

/// Compiler cache size cap handed to the launcher.
const CACHE_MAX_SIZE: &str = "10G";

/// Point the compiler environment at the configured cache launcher.
///
/// Exports `CC`/`CXX` wrapped by the launcher and a cache directory under the
/// orchestrator cache dir. Best-effort: a missing launcher binary is logged
/// and the build proceeds uncached.
pub async fn enable_compiler_cache(config: &OrchestratorConfig) {
    let launcher = &config.cc_launcher;
    tracing::info!(launcher, "Enabling compiler cache");

    std::env::set_var("CC", format!("{} gcc", launcher));
    std::env::set_var("CXX", format!("{} g++", launcher));

    let cache_dir = config.cache_dir.join("ccache");
    if let Err(e) = std::fs::create_dir_all(&cache_dir) {
        tracing::warn!(error = %e, "Failed to create compiler cache directory");
        return;
    }
    std::env::set_var("CCACHE_DIR", &cache_dir);

    let result = Command::new(launcher)
        .args(["-M", CACHE_MAX_SIZE])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        tracing::warn!(launcher, error = %e, "Compiler cache launcher unavailable");
    }
}
