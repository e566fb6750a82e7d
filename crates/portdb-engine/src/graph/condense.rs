//! SCC condensation of the package graph.
//!
//! Packages that depend on each other in a cycle cannot be ported one after
//! the other; they form one cluster. Condensation collapses every strongly
//! connected component into a single node, leaving a DAG that tiering can
//! peel leaf by leaf.

use std::collections::BTreeMap;

use petgraph::algo::condensation;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::graph::build::DepGraph;

/// One strongly connected component of the package graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SccNode {
    /// Package names, sorted.
    pub members: Vec<String>,
}

impl SccNode {
    /// `true` if the component holds more than one package.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        self.members.len() > 1
    }

    /// The lexicographically smallest member.
    #[must_use]
    pub fn representative(&self) -> &str {
        self.members
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Condensed DAG plus the member → component lookup.
#[derive(Debug, Clone)]
pub struct CondensedGraph {
    /// Edges run requirement cluster → dependent cluster, deduplicated.
    pub condensed: DiGraph<SccNode, ()>,
    pub member_to_scc: BTreeMap<String, NodeIndex>,
}

impl CondensedGraph {
    /// Collapse the SCCs of `raw` (Tarjan, via petgraph).
    #[must_use]
    #[instrument(skip(raw), fields(nodes = raw.node_count()))]
    pub fn from_graph(raw: &DepGraph) -> Self {
        let collapsed: DiGraph<Vec<String>, ()> = condensation(raw.unweighted(), true);

        let mut condensed: DiGraph<SccNode, ()> = DiGraph::with_capacity(collapsed.node_count(), 0);
        for members in collapsed.node_weights() {
            let mut sorted = members.clone();
            sorted.sort_unstable();
            condensed.add_node(SccNode { members: sorted });
        }
        for edge in collapsed.edge_references() {
            let (from, to) = (edge.source(), edge.target());
            if from != to && !condensed.contains_edge(from, to) {
                condensed.add_edge(from, to, ());
            }
        }

        let member_to_scc = condensed
            .node_indices()
            .flat_map(|idx| {
                condensed[idx]
                    .members
                    .iter()
                    .map(move |member| (member.clone(), idx))
            })
            .collect();

        Self {
            condensed,
            member_to_scc,
        }
    }

    #[must_use]
    pub fn scc_count(&self) -> usize {
        self.condensed.node_count()
    }

    /// Number of components with more than one member.
    #[must_use]
    pub fn cycle_count(&self) -> usize {
        self.condensed.node_weights().filter(|n| n.is_cycle()).count()
    }

    #[must_use]
    pub fn scc_of(&self, name: &str) -> Option<NodeIndex> {
        self.member_to_scc.get(name).copied()
    }

    /// Representative of the component holding `name`.
    #[must_use]
    pub fn representative_of(&self, name: &str) -> Option<&str> {
        self.scc_of(name)
            .and_then(|idx| self.condensed.node_weight(idx))
            .map(SccNode::representative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portdb_core::model::Dependency;

    fn graph(nodes: &[&str], requires: &[(&str, &str)]) -> DepGraph {
        let rows: Vec<Dependency> = requires
            .iter()
            .map(|(requirer, requirement)| Dependency {
                requirer: (*requirer).to_string(),
                requirement: (*requirement).to_string(),
                run_time: true,
                build_time: false,
                unversioned: false,
            })
            .collect();
        DepGraph::from_dependencies(nodes.iter().copied(), &rows)
    }

    #[test]
    fn acyclic_graph_keeps_one_node_per_package() {
        let cg = CondensedGraph::from_graph(&graph(&["a", "b", "c"], &[("b", "a"), ("c", "b")]));
        assert_eq!(cg.scc_count(), 3);
        assert_eq!(cg.cycle_count(), 0);
        assert_eq!(cg.condensed.edge_count(), 2);
    }

    #[test]
    fn cycle_collapses_to_smallest_member() {
        let cg = CondensedGraph::from_graph(&graph(
            &["x", "m", "q", "z"],
            &[("x", "m"), ("m", "q"), ("q", "x"), ("z", "q"), ("z", "x")],
        ));
        assert_eq!(cg.scc_count(), 2);
        assert_eq!(cg.cycle_count(), 1);
        assert_eq!(cg.representative_of("q"), Some("m"));
        assert_eq!(cg.representative_of("x"), Some("m"));
        assert_eq!(cg.representative_of("z"), Some("z"));
        assert_eq!(cg.condensed.edge_count(), 1, "parallel edges out of the cluster merge");
    }

    #[test]
    fn empty_scc_representative_is_empty() {
        let node = SccNode { members: vec![] };
        assert_eq!(node.representative(), "");
        assert!(!node.is_cycle());
    }
}
