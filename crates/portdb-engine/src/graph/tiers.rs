//! Porting tiers by iterated leaf removal.
//!
//! On the condensed DAG, every cluster with no remaining incoming edge
//! (nothing it depends on is still present) is removed; each removal round
//! is one tier. Clusters removed in the first round whose members are all
//! finished form tier 0, the rest of the first round tier 1, and round *k*
//! (k ≥ 2) tier *k*. A cluster thus always sits strictly above every
//! cluster it depends on.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::graph::condense::CondensedGraph;

/// One package with its cluster representative and tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TieredNode {
    pub name: String,
    pub representative: String,
    pub tier: usize,
}

/// Condensed edge between two representatives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TieredEdge {
    pub requirement: String,
    pub dependent: String,
}

/// Tier assignment for every package plus the condensed edge list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredGraph {
    /// Sorted by name.
    pub nodes: Vec<TieredNode>,
    /// Sorted by `(requirement, dependent)`.
    pub edges: Vec<TieredEdge>,
    /// Highest tier in use (0 for an empty graph).
    pub max_tier: usize,
}

impl TieredGraph {
    #[must_use]
    pub fn tier_of(&self, name: &str) -> Option<usize> {
        self.nodes
            .binary_search_by(|node| node.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.nodes[idx].tier)
    }

    /// Package names grouped by tier, in tier order.
    #[must_use]
    pub fn by_tier(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut tiers: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for node in &self.nodes {
            tiers.entry(node.tier).or_default().push(node.name.as_str());
        }
        tiers
    }
}

/// Assign tiers on a condensed graph.
///
/// `is_done` reports whether a package is already finished; it only
/// decides between tier 0 and tier 1 in the first round.
#[must_use]
#[instrument(skip_all, fields(clusters = condensed.scc_count()))]
pub fn assign_tiers(condensed: &CondensedGraph, is_done: impl Fn(&str) -> bool) -> TieredGraph {
    let dag = &condensed.condensed;

    let mut in_degree: BTreeMap<NodeIndex, usize> = dag
        .node_indices()
        .map(|idx| (idx, dag.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut cluster_tier: BTreeMap<NodeIndex, usize> = BTreeMap::new();
    let mut frontier: BTreeSet<NodeIndex> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&idx, _)| idx)
        .collect();
    let mut round = 1;

    while !frontier.is_empty() {
        let mut next = BTreeSet::new();
        for &idx in &frontier {
            let tier = if round == 1 {
                let done = dag[idx].members.iter().all(|member| is_done(member));
                usize::from(!done)
            } else {
                round
            };
            cluster_tier.insert(idx, tier);

            for dependent in dag.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.insert(dependent);
                    }
                }
            }
        }
        frontier = next;
        round += 1;
    }

    let mut max_tier = cluster_tier.values().copied().max().unwrap_or(0);
    if cluster_tier.len() < dag.node_count() {
        let residual_tier = max_tier + 1;
        for idx in dag.node_indices() {
            if !cluster_tier.contains_key(&idx) {
                warn!(
                    representative = dag[idx].representative(),
                    tier = residual_tier,
                    "cluster left after leaf removal"
                );
                cluster_tier.insert(idx, residual_tier);
            }
        }
        max_tier = residual_tier;
    }

    let mut nodes: Vec<TieredNode> = dag
        .node_indices()
        .flat_map(|idx| {
            let scc = &dag[idx];
            let tier = cluster_tier.get(&idx).copied().unwrap_or(max_tier);
            scc.members.iter().map(move |member| TieredNode {
                name: member.clone(),
                representative: scc.representative().to_string(),
                tier,
            })
        })
        .collect();
    nodes.sort_unstable();

    let mut edges: Vec<TieredEdge> = dag
        .edge_references()
        .map(|edge| TieredEdge {
            requirement: dag[edge.source()].representative().to_string(),
            dependent: dag[edge.target()].representative().to_string(),
        })
        .collect();
    edges.sort_unstable();
    edges.dedup();

    TieredGraph {
        nodes,
        edges,
        max_tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::DepGraph;
    use portdb_core::model::Dependency;

    fn tiers(nodes: &[&str], requires: &[(&str, &str)], done: &[&str]) -> TieredGraph {
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
        let graph = DepGraph::from_dependencies(nodes.iter().copied(), &rows);
        let condensed = CondensedGraph::from_graph(&graph);
        assign_tiers(&condensed, |name| done.contains(&name))
    }

    #[test]
    fn chain_gets_increasing_tiers() {
        let t = tiers(&["app", "lib", "base"], &[("app", "lib"), ("lib", "base")], &[]);
        assert_eq!(t.tier_of("base"), Some(1));
        assert_eq!(t.tier_of("lib"), Some(2));
        assert_eq!(t.tier_of("app"), Some(3));
        assert_eq!(t.max_tier, 3);
    }

    #[test]
    fn finished_leaves_are_tier_zero() {
        let t = tiers(&["app", "six", "idle"], &[("app", "six")], &["six"]);
        assert_eq!(t.tier_of("six"), Some(0));
        assert_eq!(t.tier_of("idle"), Some(1));
        assert_eq!(t.tier_of("app"), Some(2));
    }

    #[test]
    fn cycle_members_share_tier_and_representative() {
        let t = tiers(
            &["a", "b", "c", "d"],
            &[("b", "a"), ("c", "b"), ("b", "c"), ("d", "c")],
            &[],
        );
        assert_eq!(t.tier_of("b"), t.tier_of("c"));
        assert!(t.nodes.iter().filter(|n| n.name == "b" || n.name == "c").all(|n| n.representative == "b"));
        assert_eq!(t.tier_of("a"), Some(1));
        assert_eq!(t.tier_of("b"), Some(2));
        assert_eq!(t.tier_of("d"), Some(3));
        assert_eq!(
            t.edges,
            vec![
                TieredEdge { requirement: "a".into(), dependent: "b".into() },
                TieredEdge { requirement: "b".into(), dependent: "d".into() },
            ]
        );
    }

    #[test]
    fn every_condensed_edge_increases_tier() {
        let t = tiers(
            &["a", "b", "c", "d", "e"],
            &[("e", "a"), ("e", "d"), ("d", "c"), ("c", "a"), ("b", "a")],
            &["a"],
        );
        for edge in &t.edges {
            assert!(t.tier_of(&edge.dependent) > t.tier_of(&edge.requirement), "{edge:?}");
        }
        assert_eq!(t.nodes.len(), 5);
    }

    #[test]
    fn empty_graph_has_no_tiers() {
        let t = tiers(&[], &[], &[]);
        assert!(t.nodes.is_empty());
        assert_eq!(t.max_tier, 0);
        assert!(t.by_tier().is_empty());
    }
}
