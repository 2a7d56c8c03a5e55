use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_PORT: u16 = 8374;
pub const DEFAULT_CACHE_DIR: &str = ".ninja_cache";

/// Orchestrator configuration, loadable from a JSON file.
///
/// Every field has a default; a partial config file overrides only the keys it
/// names, and unknown keys are accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of concurrently executing build tasks.
    pub max_parallel_jobs: usize,
    /// Enable the compiler cache wrapper for local compilations.
    pub cache_enabled: bool,
    /// Directory for build and compiler caches.
    pub cache_dir: PathBuf,
    /// Advisory depth limit for recursive sub-builds.
    pub recursive_depth: u32,
    /// Agent heartbeat interval in seconds. An agent silent for three
    /// intervals is marked unavailable.
    pub heartbeat_interval: u64,
    /// Scheduling strategy name. Currently advisory only.
    pub optimization_strategy: String,
    /// Compiler cache launcher prepended to CC/CXX.
    pub cc_launcher: String,
    /// Maximum execution attempts per task before it is marked failed.
    pub max_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: host_cores(),
            cache_enabled: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            recursive_depth: 3,
            heartbeat_interval: 5,
            optimization_strategy: "balanced".to_string(),
            cc_launcher: "ccache".to_string(),
            max_retries: 3,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a JSON file, falling back to defaults.
    ///
    /// A missing or unreadable file logs a warning and yields the defaults,
    /// matching the non-fatal posture of the rest of discovery.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }
}

/// Number of logical cores on this host, with a safe floor of one.
pub fn host_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = OrchestratorConfig::default();
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.cache_dir, PathBuf::from(".ninja_cache"));
        assert_eq!(cfg.recursive_depth, 3);
        assert_eq!(cfg.heartbeat_interval, 5);
        assert_eq!(cfg.optimization_strategy, "balanced");
        assert_eq!(cfg.cc_launcher, "ccache");
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.max_parallel_jobs >= 1);
    }

    #[test]
    fn load_missing_path_uses_defaults() {
        let cfg = OrchestratorConfig::load(None);
        assert!(cfg.cache_enabled);
    }

    #[test]
    fn load_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"heartbeat_interval": 9, "cache_enabled": false}}"#).unwrap();

        let cfg = OrchestratorConfig::load(Some(file.path()));
        assert_eq!(cfg.heartbeat_interval, 9);
        assert!(!cfg.cache_enabled);
        assert_eq!(cfg.cc_launcher, "ccache");
    }

    #[test]
    fn load_ignores_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_parallel_jobs": 4, "some_future_option": true}}"#
        )
        .unwrap();

        let cfg = OrchestratorConfig::load(Some(file.path()));
        assert_eq!(cfg.max_parallel_jobs, 4);
    }

    #[test]
    fn load_malformed_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let cfg = OrchestratorConfig::load(Some(file.path()));
        assert_eq!(cfg.recursive_depth, 3);
    }
}
