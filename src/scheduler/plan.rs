use std::path::Path;

use crate::graph::{topo::topological_sort, BuildGraph};
use crate::scheduler::task::Task;

/// Weight of the dependents term in the composite priority. Unblocking a wide
/// fan-in target early buys more parallelism than strict rank order.
const DEPENDENTS_WEIGHT: i64 = 10;

/// Turn the build graph into a priority-ordered task list.
///
/// Each task gets `priority = topological_rank + 10 * dependents_count`, and
/// the result is sorted stable-descending by that priority.
pub fn plan_tasks(graph: &BuildGraph, build_dir: &Path) -> Vec<Task> {
    let topo = topological_sort(graph);

    let mut tasks: Vec<Task> = topo
        .order
        .iter()
        .enumerate()
        .map(|(rank, target)| {
            let mut deps = graph.dependencies(target).cloned().unwrap_or_default();
            // A back-edge broken by the sort must not gate readiness either,
            // or the tasks inside the cycle would wait on each other forever.
            for (from, to) in &topo.broken_edges {
                if from == target {
                    deps.remove(to);
                }
            }
            let dependents = graph.dependents_count(target) as i64;
            let mut task = Task::new(target.clone(), build_dir.to_path_buf(), deps);
            task.priority = rank as i64 + dependents * DEPENDENTS_WEIGHT;
            task
        })
        .collect();

    tasks.sort_by(|a, b| b.priority.cmp(&a.priority));

    tracing::info!(tasks = tasks.len(), "Build plan optimized");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn graph(pairs: &[(&str, &[&str])]) -> BuildGraph {
        BuildGraph::from_listings(
            pairs
                .iter()
                .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn priority_is_rank_plus_weighted_dependents() {
        // Chain a <- b <- c: topo order is [a, b, c].
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let tasks = plan_tasks(&g, &PathBuf::from("build"));

        let find = |t: &str| tasks.iter().find(|x| x.target == t).unwrap();
        // a: rank 0, one dependent -> 10. b: rank 1, one dependent -> 11.
        // c: rank 2, no dependents -> 2.
        assert_eq!(find("a").priority, 10);
        assert_eq!(find("b").priority, 11);
        assert_eq!(find("c").priority, 2);
    }

    #[test]
    fn wide_fan_in_is_biased_early() {
        let g = graph(&[
            ("base", &[]),
            ("x", &["base"]),
            ("y", &["base"]),
            ("z", &["base"]),
        ]);
        let tasks = plan_tasks(&g, &PathBuf::from("build"));
        // base has three dependents and rank 0: priority 30, first in the list.
        assert_eq!(tasks[0].target, "base");
        assert_eq!(tasks[0].priority, 30);
    }

    #[test]
    fn broken_cycle_edges_do_not_gate_readiness() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        let tasks = plan_tasks(&g, &PathBuf::from("build"));
        assert_eq!(tasks.len(), 2);
        // Exactly one side of the cycle had its constraint dropped, so at
        // least one task starts with no unsatisfied dependencies.
        assert!(tasks.iter().any(|t| t.dependencies.is_empty()));
    }

    #[test]
    fn sorted_descending() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);
        let tasks = plan_tasks(&g, &PathBuf::from("build"));
        for pair in tasks.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }
}
