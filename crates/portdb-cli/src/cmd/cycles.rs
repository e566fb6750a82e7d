//! `portdb cycles`: dependency cycles and requirements that would break them.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use portdb_engine::graph::CycleReport;

use super::DataSource;
use crate::output::{OutputMode, render};

/// Arguments for `portdb cycles`.
#[derive(Args, Debug, Default)]
pub struct CyclesArgs {}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<CycleReport>,
}

/// Execute `portdb cycles`.
pub fn run_cycles(_args: &CyclesArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let payload = CyclesOutput {
        cycles: snapshot.cycles,
    };
    render(output, &payload, render_cycles_human)
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No dependency cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Dependency cycles ({})", payload.cycles.len())?;

    for (idx, cycle) in payload.cycles.iter().enumerate() {
        writeln!(w, "\nCycle {} ({} packages):", idx + 1, cycle.members.len())?;
        for name in &cycle.members {
            writeln!(w, "  - {name}")?;
        }
        if !cycle.suggested_breaks.is_empty() {
            writeln!(w, "  Break by dropping:")?;
            for (requirer, requirement) in &cycle.suggested_breaks {
                writeln!(w, "    {requirer} → {requirement}")?;
            }
        }
    }

    Ok(())
}
