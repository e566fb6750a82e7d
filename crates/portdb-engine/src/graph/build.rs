//! Package dependency graph construction.
//!
//! ## Edge Direction
//!
//! An edge `A → B` means "B depends on A" (A is a requirement of B). A
//! package therefore sits downstream of everything it needs, and leaf
//! removal on the graph peels packages off in porting order.
//!
//! Both run-time and build-time requirements produce edges. The edge
//! weight records which kinds were present.
//!
//! ## Content Hash
//!
//! [`DepGraph::content_hash`] is a BLAKE3 hash of the sorted edge list, so
//! it changes only when edges change.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use portdb_core::model::Dependency;

/// Which requirement kinds an edge carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeKinds {
    pub run_time: bool,
    pub build_time: bool,
}

/// Directed package graph. Nodes are package names.
#[derive(Debug, Clone)]
pub struct DepGraph {
    /// Edges run requirement → dependent.
    pub graph: DiGraph<String, EdgeKinds>,
    /// Package name → node index.
    pub node_map: BTreeMap<String, NodeIndex>,
    /// BLAKE3 content hash of the edge set.
    pub content_hash: String,
}

impl DepGraph {
    /// Build a graph over `nodes` from dependency rows.
    ///
    /// Every name in `nodes` becomes a node even without edges. Rows whose
    /// endpoints are not listed in `nodes` are skipped, as are self-loops.
    #[must_use]
    #[instrument(skip_all, fields(rows = dependencies.len()))]
    pub fn from_dependencies<'a>(
        nodes: impl IntoIterator<Item = &'a str>,
        dependencies: &[Dependency],
    ) -> Self {
        let mut names: Vec<&str> = nodes.into_iter().collect();
        names.sort_unstable();
        names.dedup();

        let mut graph = DiGraph::<String, EdgeKinds>::with_capacity(names.len(), dependencies.len());
        let mut node_map = BTreeMap::new();
        for name in names {
            let idx = graph.add_node(name.to_string());
            node_map.insert(name.to_string(), idx);
        }

        let mut edges: Vec<(&str, &str, EdgeKinds)> = dependencies
            .iter()
            .filter(|dep| dep.requirer != dep.requirement)
            .filter(|dep| dep.run_time || dep.build_time)
            .map(|dep| {
                (
                    dep.requirement.as_str(),
                    dep.requirer.as_str(),
                    EdgeKinds {
                        run_time: dep.run_time,
                        build_time: dep.build_time,
                    },
                )
            })
            .collect();
        edges.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut hashed: Vec<(&str, &str)> = Vec::with_capacity(edges.len());
        for (requirement, dependent, kinds) in edges {
            let (Some(&from), Some(&to)) = (node_map.get(requirement), node_map.get(dependent))
            else {
                continue;
            };
            match graph.find_edge(from, to) {
                Some(existing) => {
                    if let Some(weight) = graph.edge_weight_mut(existing) {
                        weight.run_time |= kinds.run_time;
                        weight.build_time |= kinds.build_time;
                    }
                }
                None => {
                    graph.add_edge(from, to, kinds);
                    hashed.push((requirement, dependent));
                }
            }
        }

        let content_hash = compute_edge_hash(&hashed);
        Self {
            graph,
            node_map,
            content_hash,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_map.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Same nodes, edge weights dropped. Cycle helpers work on this shape.
    #[must_use]
    pub fn unweighted(&self) -> DiGraph<String, ()> {
        self.graph.map(|_, name| name.clone(), |_, _| ())
    }
}

/// BLAKE3 hash of a sorted `(requirement, dependent)` edge list.
fn compute_edge_hash(edges: &[(&str, &str)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (requirement, dependent) in edges {
        hasher.update(requirement.as_bytes());
        hasher.update(b"\x00");
        hasher.update(dependent.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}
