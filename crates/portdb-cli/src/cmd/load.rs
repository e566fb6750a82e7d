//! `portdb load`: load the data, derive everything, and summarize.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use portdb_engine::DerivedSnapshot;

use super::DataSource;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `portdb load`.
#[derive(Args, Debug, Default)]
pub struct LoadArgs {
    /// Write the full derived snapshot as JSON to this file.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct LoadSummary {
    collection: String,
    packages: usize,
    groups: usize,
    dependencies: usize,
    cycles: usize,
    max_tier: usize,
    percent_done: f64,
    graph_hash: String,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl LoadSummary {
    fn new(snapshot: &DerivedSnapshot, output: Option<&PathBuf>) -> Self {
        Self {
            collection: snapshot.collection.clone(),
            packages: snapshot.packages.len(),
            groups: snapshot.groups.len(),
            dependencies: snapshot.dependencies.len(),
            cycles: snapshot.cycles.len(),
            max_tier: snapshot.tiers.max_tier,
            percent_done: snapshot.status_counts().percent_done,
            graph_hash: snapshot.graph_hash.clone(),
            warnings: snapshot.warnings.clone(),
            output: output.map(|p| p.display().to_string()),
        }
    }
}

/// Execute `portdb load`.
pub fn run_load(args: &LoadArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;

    for message in &snapshot.warnings {
        warn!("{message}");
    }

    if let Some(path) = &args.output {
        let json = snapshot.to_json()?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote snapshot");
    }

    let summary = LoadSummary::new(&snapshot, args.output.as_ref());
    render_mode(output, &summary, render_text, render_pretty)
}

fn render_text(summary: &LoadSummary, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{} packages={} groups={} dependencies={} cycles={} tiers={} done={:.1}% {}",
        summary.collection,
        summary.packages,
        summary.groups,
        summary.dependencies,
        summary.cycles,
        summary.max_tier + 1,
        summary.percent_done,
        summary.graph_hash,
    )?;
    for message in &summary.warnings {
        writeln!(w, "warning: {message}")?;
    }
    Ok(())
}

fn render_pretty(summary: &LoadSummary, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Loaded {}", summary.collection))?;
    pretty_kv(w, "Packages", summary.packages.to_string())?;
    pretty_kv(w, "Groups", summary.groups.to_string())?;
    pretty_kv(w, "Dependencies", summary.dependencies.to_string())?;
    pretty_kv(w, "Cycles", summary.cycles.to_string())?;
    pretty_kv(w, "Tiers", (summary.max_tier + 1).to_string())?;
    pretty_kv(w, "Done", format!("{:.1}%", summary.percent_done))?;
    pretty_kv(w, "Graph hash", &summary.graph_hash)?;
    if let Some(path) = &summary.output {
        pretty_kv(w, "Written to", path)?;
    }
    if !summary.warnings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Warnings")?;
        for message in &summary.warnings {
            writeln!(w, "  - {message}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> LoadSummary {
        LoadSummary {
            collection: "fedora".to_string(),
            packages: 3,
            groups: 1,
            dependencies: 2,
            cycles: 0,
            max_tier: 2,
            percent_done: 33.333,
            graph_hash: "blake3:abc".to_string(),
            warnings: vec!["override lowers foo from py3-only to idle".to_string()],
            output: None,
        }
    }

    #[test]
    fn text_summary_is_one_line_plus_warnings() {
        let mut out = Vec::new();
        render_text(&summary(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("fedora packages=3"));
        assert!(lines[0].contains("tiers=3"));
        assert!(lines[0].contains("done=33.3%"));
        assert!(lines[1].starts_with("warning: override lowers foo"));
    }

    #[test]
    fn pretty_summary_lists_warnings_section() {
        let mut out = Vec::new();
        render_pretty(&summary(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Loaded fedora"));
        assert!(text.contains("Warnings"));
        assert!(!text.contains("Written to"));
    }
}
