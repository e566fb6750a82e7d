//! Package dependency graph.
//!
//! ## Pipeline
//!
//! ```text
//! FactStore dependency rows
//!        ↓  build::DepGraph::from_dependencies()
//! DepGraph (requirement → dependent, possible cycles)
//!        ↓  condense::CondensedGraph::from_graph()
//! CondensedGraph (SCCs collapsed, DAG)
//!        ↓  tiers::assign_tiers()
//! TieredGraph (tier per package, condensed edge list)
//! ```
//!
//! Group closures walk the fact store directly ([`closure`]); cycle reports
//! ([`cycles`]) run on the uncondensed graph.

pub mod build;
pub mod closure;
pub mod condense;
pub mod cycles;
pub mod tiers;

pub use build::{DepGraph, EdgeKinds};
pub use closure::{GroupMembership, closure, group_closures, package_groups};
pub use condense::{CondensedGraph, SccNode};
pub use cycles::{CycleReport, find_all_cycles, report_cycles_with_breaks};
pub use tiers::{TieredEdge, TieredGraph, TieredNode, assign_tiers};
