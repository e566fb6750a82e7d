//! `portdb report`: every package with its status and pending requirements.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use portdb_core::model::Status;
use portdb_engine::DerivedSnapshot;

use super::DataSource;
use crate::output::{OutputMode, render_mode};

/// Arguments for `portdb report`.
#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Only list packages in this status (repeatable).
    #[arg(long = "status", value_name = "STATUS")]
    pub statuses: Vec<Status>,

    /// Sort by name instead of by status weight.
    #[arg(long)]
    pub by_name: bool,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    name: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    /// Requirements that are neither released nor dropped.
    pending: Vec<String>,
}

fn build_rows(snapshot: &DerivedSnapshot, args: &ReportArgs) -> Vec<ReportRow> {
    let mut packages = snapshot.by_weight();
    if args.by_name {
        packages.sort_by_cached_key(|p| (p.name.to_lowercase(), p.name.clone()));
    }
    packages
        .into_iter()
        .filter(|p| args.statuses.is_empty() || args.statuses.contains(&p.status))
        .map(|p| ReportRow {
            name: p.name.clone(),
            status: p.status,
            note: p.note.clone(),
            pending: snapshot
                .pending_requirements(&p.name)
                .into_iter()
                .map(|r| r.name.clone())
                .collect(),
        })
        .collect()
}

/// Execute `portdb report`.
pub fn run_report(args: &ReportArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let rows = build_rows(&snapshot, args);
    render_mode(output, &rows, render_text, render_pretty)
}

fn render_text(rows: &Vec<ReportRow>, w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        writeln!(w, "{}\t{}\t{}", row.status, row.name, row.pending.join(","))?;
    }
    Ok(())
}

fn render_pretty(rows: &Vec<ReportRow>, w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        write!(w, "{} {}", row.status.abbrev(), row.name)?;
        if !row.pending.is_empty() {
            write!(w, " ({})", row.pending.join(", "))?;
        }
        writeln!(w)?;
        if let Some(note) = &row.note {
            writeln!(w, "    {note}")?;
        }
    }
    Ok(())
}
