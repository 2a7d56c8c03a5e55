//! In-memory build dependency graph, populated once per run from the
//! external build tool.

pub mod topo;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::error::{OrchestratorError, Result};
use crate::ninja::BuildTool;

/// DAG of build targets and their dependency edges.
///
/// Derived data: the task queue is authoritative for scheduling state. Target
/// order is preserved from the build tool so traversal and priority
/// assignment are deterministic.
#[derive(Debug, Default)]
pub struct BuildGraph {
    targets: Vec<String>,
    deps: HashMap<String, BTreeSet<String>>,
}

impl BuildGraph {
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn dependencies(&self, target: &str) -> Option<&BTreeSet<String>> {
        self.deps.get(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of targets whose dependency set includes `target`.
    pub fn dependents_count(&self, target: &str) -> usize {
        self.deps.values().filter(|d| d.contains(target)).count()
    }

    /// Build a graph from raw target/dependency listings.
    ///
    /// Duplicate targets and self-dependencies are dropped, and dependencies
    /// pointing outside the known target set are discarded: no such task
    /// exists to wait on, so they count as already satisfied.
    pub fn from_listings(listings: Vec<(String, Vec<String>)>) -> Self {
        let known: HashSet<String> = listings.iter().map(|(t, _)| t.clone()).collect();

        let mut graph = BuildGraph::default();
        for (target, raw_deps) in listings {
            if graph.deps.contains_key(&target) {
                tracing::debug!(target, "Duplicate target dropped");
                continue;
            }
            let deps: BTreeSet<String> = raw_deps
                .into_iter()
                .filter(|d| *d != target && known.contains(d))
                .collect();
            graph.targets.push(target.clone());
            graph.deps.insert(target, deps);
        }
        graph
    }
}

/// Populate a build graph by querying the external build tool.
///
/// A dependency query failure for one target is logged and that target is
/// omitted; only total absence of usable output aborts the run.
pub async fn ingest(tool: &dyn BuildTool, build_dir: &Path) -> Result<BuildGraph> {
    tracing::info!(build_dir = %build_dir.display(), "Parsing build targets");

    let targets = tool.list_targets(build_dir).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to enumerate build targets");
        e
    })?;

    let mut listings = Vec::with_capacity(targets.len());
    for target in targets {
        match tool.dependencies(build_dir, &target).await {
            Ok(deps) => listings.push((target, deps)),
            Err(e) => {
                tracing::warn!(target, error = %e, "Dependency query failed, target omitted");
            }
        }
    }

    let graph = BuildGraph::from_listings(listings);
    if graph.is_empty() {
        return Err(OrchestratorError::EmptyGraph(build_dir.to_path_buf()));
    }

    tracing::info!(targets = graph.len(), "Parsed build graph");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(pairs: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        pairs
            .iter()
            .map(|(t, d)| {
                (
                    t.to_string(),
                    d.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    #[test]
    fn drops_self_dependencies() {
        let graph = BuildGraph::from_listings(listing(&[("a", &["a", "b"]), ("b", &[])]));
        assert_eq!(
            graph.dependencies("a").unwrap().iter().collect::<Vec<_>>(),
            vec!["b"]
        );
    }

    #[test]
    fn drops_unknown_dependencies() {
        let graph = BuildGraph::from_listings(listing(&[("a", &["missing.h", "b"]), ("b", &[])]));
        assert_eq!(graph.dependencies("a").unwrap().len(), 1);
        assert!(graph.dependencies("a").unwrap().contains("b"));
    }

    #[test]
    fn deduplicates_targets() {
        let graph = BuildGraph::from_listings(listing(&[("a", &[]), ("a", &["b"]), ("b", &[])]));
        assert_eq!(graph.len(), 2);
        assert!(graph.dependencies("a").unwrap().is_empty());
    }

    #[test]
    fn counts_dependents() {
        let graph =
            BuildGraph::from_listings(listing(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]));
        assert_eq!(graph.dependents_count("a"), 2);
        assert_eq!(graph.dependents_count("b"), 0);
    }
}
