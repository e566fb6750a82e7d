//! `portdb status`: per-status package counts and overall progress.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use portdb_core::model::Status;
use portdb_engine::snapshot::StatusCounts;

use super::DataSource;
use crate::output::{OutputMode, pretty_section, render_mode};

const BAR_WIDTH: usize = 40;

/// Arguments for `portdb status`.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct StatusReport {
    collection: String,
    #[serde(flatten)]
    counts: StatusCounts,
}

/// Execute `portdb status`.
pub fn run_status(_args: &StatusArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let report = StatusReport {
        collection: snapshot.collection.clone(),
        counts: snapshot.status_counts(),
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn nonzero(counts: &StatusCounts) -> impl Iterator<Item = &(Status, usize)> {
    counts.counts.iter().filter(|(_, n)| *n > 0)
}

fn render_text(report: &StatusReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.counts.total == 0 {
        return writeln!(w, "  ???% {}", report.collection);
    }
    let detail = nonzero(&report.counts)
        .map(|(status, n)| format!("{n} {status}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        w,
        "{:5.1}% {}  ({detail})",
        report.counts.percent_done, report.collection
    )
}

fn render_pretty(report: &StatusReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "{}: {} of {} packages done ({:.1}%)",
            report.collection, report.counts.done, report.counts.total, report.counts.percent_done
        ),
    )?;
    let total = report.counts.total.max(1);
    for (status, n) in nonzero(&report.counts) {
        let filled = n * BAR_WIDTH / total;
        writeln!(
            w,
            "{} {:<12} {n:>6}  {}",
            status.abbrev(),
            status.name(),
            "█".repeat(filled.max(1))
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(counts: &[(Status, usize)]) -> StatusReport {
        let total = counts.iter().map(|(_, n)| n).sum();
        let done = counts.iter().filter(|(s, _)| s.is_done()).map(|(_, n)| n).sum();
        #[allow(clippy::cast_precision_loss)]
        let percent_done = if total == 0 { 0.0 } else { done as f64 * 100.0 / total as f64 };
        StatusReport {
            collection: "fedora".to_string(),
            counts: StatusCounts {
                counts: counts.to_vec(),
                total,
                done,
                percent_done,
            },
        }
    }

    #[test]
    fn text_line_lists_nonzero_statuses() {
        let mut out = Vec::new();
        render_text(
            &report(&[(Status::Released, 3), (Status::Idle, 1), (Status::Blocked, 0)]),
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), " 75.0% fedora  (3 released, 1 idle)\n");
    }

    #[test]
    fn empty_collection_has_unknown_progress() {
        let mut out = Vec::new();
        render_text(&report(&[]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "  ???% fedora\n");
    }

    #[test]
    fn json_flattens_counts() {
        let value = serde_json::to_value(report(&[(Status::Idle, 2)])).unwrap();
        assert_eq!(value["collection"], "fedora");
        assert_eq!(value["total"], 2);
        assert_eq!(value["counts"][0][0], "idle");
    }
}
