//! `portdb tiers`: porting order of the condensed dependency graph.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use portdb_engine::DerivedSnapshot;
use portdb_engine::graph::TieredEdge;

use super::DataSource;
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `portdb tiers`.
#[derive(Args, Debug, Default)]
pub struct TiersArgs {
    /// Also list the condensed edges.
    #[arg(long)]
    pub edges: bool,
}

#[derive(Debug, Serialize)]
struct Tier {
    tier: usize,
    packages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TiersReport {
    max_tier: usize,
    tiers: Vec<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edges: Option<Vec<TieredEdge>>,
}

fn build_report(snapshot: &DerivedSnapshot, with_edges: bool) -> TiersReport {
    let graph = snapshot.tiered_graph();
    TiersReport {
        max_tier: graph.max_tier,
        tiers: graph
            .by_tier()
            .into_iter()
            .map(|(tier, names)| Tier {
                tier,
                packages: names.into_iter().map(str::to_string).collect(),
            })
            .collect(),
        edges: with_edges.then(|| graph.edges.clone()),
    }
}

/// Execute `portdb tiers`.
pub fn run_tiers(args: &TiersArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let report = build_report(&snapshot, args.edges);
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &TiersReport, w: &mut dyn Write) -> std::io::Result<()> {
    for tier in &report.tiers {
        for name in &tier.packages {
            writeln!(w, "{}\t{name}", tier.tier)?;
        }
    }
    for edge in report.edges.iter().flatten() {
        writeln!(w, "edge\t{}\t{}", edge.requirement, edge.dependent)?;
    }
    Ok(())
}

fn render_pretty(report: &TiersReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.tiers.is_empty() {
        return writeln!(w, "No packages.");
    }
    for tier in &report.tiers {
        let heading = if tier.tier == 0 {
            format!("Tier 0: finished ({})", tier.packages.len())
        } else {
            format!("Tier {} ({})", tier.tier, tier.packages.len())
        };
        pretty_section(w, &heading)?;
        for name in &tier.packages {
            writeln!(w, "  {name}")?;
        }
        writeln!(w)?;
    }
    if let Some(edges) = &report.edges {
        pretty_section(w, &format!("Edges ({})", edges.len()))?;
        for edge in edges {
            writeln!(w, "  {} → {}", edge.requirement, edge.dependent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use portdb_core::config::PortdbConfig;
    use portdb_core::facts::FactStore;
    use portdb_core::model::{PackageFacts, Status};
    use portdb_engine::derive;

    fn snapshot() -> DerivedSnapshot {
        let mut app = PackageFacts::new("app");
        app.deps.insert("lib".to_string());
        let mut gone = PackageFacts::new("gone");
        gone.status = Some(Status::Dropped);
        let packages = [app, PackageFacts::new("lib"), gone]
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        derive(
            &FactStore::new("test", packages, BTreeMap::new(), BTreeMap::new()),
            &PortdbConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn tiers_follow_requirements() {
        let report = build_report(&snapshot(), false);
        let flat: Vec<(usize, &str)> = report
            .tiers
            .iter()
            .flat_map(|t| t.packages.iter().map(move |p| (t.tier, p.as_str())))
            .collect();
        assert_eq!(flat, vec![(0, "gone"), (1, "lib"), (2, "app")]);
        assert_eq!(report.max_tier, 2);
        assert!(report.edges.is_none());
    }

    #[test]
    fn edges_are_optional() {
        let report = build_report(&snapshot(), true);
        let edges = report.edges.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].requirement.as_str(), edges[0].dependent.as_str()), ("lib", "app"));
    }
}
