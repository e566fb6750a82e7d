//! `portdb diff`: status changes between two exported snapshots.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use portdb_core::model::Status;
use portdb_engine::snapshot::StatusChange;

use super::read_export;
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `portdb diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Older export (`portdb load --output`).
    pub old: PathBuf,
    /// Newer export.
    pub new: PathBuf,
}

#[derive(Debug, Serialize)]
struct DiffReport {
    old_hash: String,
    new_hash: String,
    old_percent_done: f64,
    new_percent_done: f64,
    changes: Vec<StatusChange>,
}

/// Execute `portdb diff`.
pub fn run_diff(args: &DiffArgs, output: OutputMode) -> anyhow::Result<()> {
    let old = read_export(&args.old)?;
    let new = read_export(&args.new)?;
    let report = DiffReport {
        old_hash: old.graph_hash.clone(),
        new_hash: new.graph_hash.clone(),
        old_percent_done: old.status_counts().percent_done,
        new_percent_done: new.status_counts().percent_done,
        changes: new.status_changes(&old),
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn label(status: Option<Status>) -> &'static str {
    status.map_or("-", Status::as_str)
}

fn render_text(report: &DiffReport, w: &mut dyn Write) -> std::io::Result<()> {
    for change in &report.changes {
        writeln!(w, "{}\t{}\t{}", change.name, label(change.old), label(change.new))?;
    }
    Ok(())
}

fn render_pretty(report: &DiffReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "{} changes, {:.1}% → {:.1}% done",
            report.changes.len(),
            report.old_percent_done,
            report.new_percent_done
        ),
    )?;
    if report.old_hash != report.new_hash {
        writeln!(w, "dependency graph changed")?;
    }
    let width = report.changes.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for change in &report.changes {
        let line = match (change.old, change.new) {
            (None, Some(new)) => format!("added as {new}"),
            (Some(old), None) => format!("removed (was {old})"),
            _ => format!("{} → {}", label(change.old), label(change.new)),
        };
        writeln!(w, "  {:<width$}  {line}", change.name)?;
    }
    Ok(())
}
