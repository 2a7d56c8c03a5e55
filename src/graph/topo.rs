use std::collections::HashMap;

use crate::graph::BuildGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Result of a dependency-first traversal.
#[derive(Debug, Default)]
pub struct TopoResult {
    /// Total order over the acyclic subgraph; every target exactly once.
    pub order: Vec<String>,
    /// Back-edges `(from, to)` skipped to break cycles. The scheduler drops
    /// these constraints, otherwise the tasks inside the cycle could never
    /// become ready.
    pub broken_edges: Vec<(String, String)>,
}

/// Dependency-first total order over the acyclic subgraph.
///
/// Explicit stack-based depth-first traversal with three-color marking. A
/// dependency edge back to an in-progress target indicates a cycle; the edge
/// is logged, recorded as broken, and skipped.
pub fn topological_sort(graph: &BuildGraph) -> TopoResult {
    let targets = graph.targets();
    let index: HashMap<&str, usize> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; targets.len()];
    let mut result = TopoResult::default();

    for root in 0..targets.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // Frame: (target index, next dependency offset).
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::InProgress;

        while let Some(&(node, next_dep)) = stack.last() {
            let dep = graph
                .dependencies(&targets[node])
                .and_then(|deps| deps.iter().nth(next_dep).cloned());

            match dep {
                Some(dep) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.1 += 1;
                    }
                    let dep_idx = index[dep.as_str()];
                    match marks[dep_idx] {
                        Mark::Unvisited => {
                            marks[dep_idx] = Mark::InProgress;
                            stack.push((dep_idx, 0));
                        }
                        Mark::InProgress => {
                            tracing::warn!(
                                target = %targets[node],
                                dependency = %dep,
                                "Circular dependency detected, edge ignored"
                            );
                            result.broken_edges.push((targets[node].clone(), dep));
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    result.order.push(targets[node].clone());
                    stack.pop();
                }
            }
        }
    }

    result
}
