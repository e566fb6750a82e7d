//! Dependency cycle reporting.
//!
//! Cycles do not stop derivation (condensation absorbs them) but they are
//! worth showing: every package in a cycle has to be ported together unless
//! one of the requirements is broken.

use std::collections::{BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// A dependency cycle and the requirements whose removal breaks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Sorted package names in the cycle.
    pub members: Vec<String>,
    /// `(requirer, requirement)` pairs closing the cycle, sorted.
    pub suggested_breaks: Vec<(String, String)>,
}

/// Find all cycles in a graph whose edges run requirement → dependent.
///
/// Each entry is the sorted member list of one strongly connected
/// component with more than one package.
#[must_use]
pub fn find_all_cycles(graph: &DiGraph<String, ()>) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut ids: Vec<String> = component.into_iter().map(|idx| node_id(graph, idx)).collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    cycles.sort_unstable();
    cycles
}

/// Detect all cycles and suggest requirements to drop for each.
///
/// Suggestions are the back-edges of a DFS inside the component, started
/// from its smallest member.
#[must_use]
pub fn report_cycles_with_breaks(graph: &DiGraph<String, ()>) -> Vec<CycleReport> {
    let mut reports: Vec<CycleReport> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut members: Vec<String> = component.iter().map(|&idx| node_id(graph, idx)).collect();
            members.sort_unstable();

            let member_set: HashSet<NodeIndex> = component.iter().copied().collect();
            let suggested_breaks = find_back_edges_in_scc(graph, &component, &member_set)
                .into_iter()
                .map(|(requirement, requirer)| (requirer, requirement))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            CycleReport {
                members,
                suggested_breaks,
            }
        })
        .collect();

    reports.sort_unstable_by(|a, b| a.members.cmp(&b.members));
    reports
}

/// Iterative DFS within one SCC collecting back-edges as graph-ordered
/// `(source, target)` name pairs.
fn find_back_edges_in_scc(
    graph: &DiGraph<String, ()>,
    component: &[NodeIndex],
    member_set: &HashSet<NodeIndex>,
) -> Vec<(String, String)> {
    let mut starts: Vec<NodeIndex> = component.to_vec();
    starts.sort_unstable_by_key(|&idx| node_id(graph, idx));

    let successors = |node: NodeIndex| -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = graph
            .neighbors_directed(node, Direction::Outgoing)
            .filter(|n| member_set.contains(n))
            .collect();
        next.sort_unstable_by_key(|&idx| node_id(graph, idx));
        next
    };

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut on_path: HashSet<NodeIndex> = HashSet::new();
    let mut back_edges: Vec<(String, String)> = Vec::new();
    // (node, successors, next successor position)
    let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

    for start in starts {
        if !visited.insert(start) {
            continue;
        }
        on_path.insert(start);
        stack.push((start, successors(start), 0));

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            if frame.2 < frame.1.len() {
                let neighbor = frame.1[frame.2];
                frame.2 += 1;

                if on_path.contains(&neighbor) {
                    back_edges.push((node_id(graph, current), node_id(graph, neighbor)));
                } else if visited.insert(neighbor) {
                    on_path.insert(neighbor);
                    stack.push((neighbor, successors(neighbor), 0));
                }
            } else {
                stack.pop();
                on_path.remove(&current);
            }
        }
    }

    back_edges
}

fn node_id(graph: &DiGraph<String, ()>, idx: NodeIndex) -> String {
    graph
        .node_weight(idx)
        .cloned()
        .unwrap_or_else(|| format!("#{}", idx.index()))
}
