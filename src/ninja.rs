//! Boundary to the external ninja build tool.
//!
//! The orchestrator consumes, not computes: target enumeration and dependency
//! queries come from ninja itself, and actual compilation is a ninja
//! invocation. [`BuildTool`] is the seam; [`NinjaCli`] shells out to the real
//! binary, and tests substitute in-memory implementations.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{OrchestratorError, Result};

/// Outcome of building a single target.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub success: bool,
    /// Captured stderr when the build failed, empty otherwise.
    pub diagnostics: String,
}

/// Interface to the external build tool.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// List all known target names in the build directory.
    async fn list_targets(&self, build_dir: &Path) -> Result<Vec<String>>;

    /// List the dependency target names of one target.
    async fn dependencies(&self, build_dir: &Path, target: &str) -> Result<Vec<String>>;

    /// Build exactly one target in the build directory.
    async fn build(&self, build_dir: &Path, target: &str) -> Result<BuildOutcome>;
}

/// The real ninja CLI.
#[derive(Debug, Clone)]
pub struct NinjaCli {
    program: String,
}

impl Default for NinjaCli {
    fn default() -> Self {
        Self {
            program: "ninja".to_string(),
        }
    }
}

impl NinjaCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_tool(&self, build_dir: &Path, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.program)
            .arg("-C")
            .arg(build_dir)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| OrchestratorError::BuildTool(format!("{} failed to start: {}", self.program, e)))
    }

    /// Best-effort `ninja -t clean`.
    pub async fn clean(&self, build_dir: &Path) {
        if let Err(e) = self.run_tool(build_dir, &["-t", "clean"]).await {
            tracing::warn!(error = %e, "Clean failed");
        }
    }
}

#[async_trait]
impl BuildTool for NinjaCli {
    async fn list_targets(&self, build_dir: &Path) -> Result<Vec<String>> {
        let output = self.run_tool(build_dir, &["-t", "targets", "all"]).await?;
        if !output.status.success() {
            return Err(OrchestratorError::BuildTool(format!(
                "target listing failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Each line is "path/to/target: rule"
        let stdout = String::from_utf8_lossy(&output.stdout);
        let targets = stdout
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let name = line.split(':').next()?.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();
        Ok(targets)
    }

    async fn dependencies(&self, build_dir: &Path, target: &str) -> Result<Vec<String>> {
        let output = self.run_tool(build_dir, &["-t", "query", target]).await?;
        if !output.status.success() {
            return Err(OrchestratorError::BuildTool(format!(
                "dependency query for {} failed: {}",
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Query output nests inputs under section headers; the first line names
        // the target itself and header lines end with a colon.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let deps = stdout
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.ends_with(':'))
            .map(|line| {
                // "input: rule" entries carry the rule after a colon
                line.split(':').next().unwrap_or(line).trim().to_string()
            })
            .filter(|name| !name.is_empty())
            .collect();
        Ok(deps)
    }

    async fn build(&self, build_dir: &Path, target: &str) -> Result<BuildOutcome> {
        let output = self.run_tool(build_dir, &[target]).await?;
        let success = output.status.success();
        let diagnostics = if success {
            String::new()
        } else {
            String::from_utf8_lossy(&output.stderr).to_string()
        };
        Ok(BuildOutcome {
            success,
            diagnostics,
        })
    }
}
