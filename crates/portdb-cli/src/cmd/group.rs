//! `portdb group`: list groups, or show one group's derived membership.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use portdb_core::model::Status;
use portdb_engine::DerivedSnapshot;

use super::DataSource;
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};

/// Arguments for `portdb group`.
#[derive(Args, Debug, Default)]
pub struct GroupArgs {
    /// Group ident; lists all groups when omitted.
    pub ident: Option<String>,

    /// Include hidden groups in the listing.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    ident: String,
    name: String,
    hidden: bool,
    packages: usize,
    done: usize,
}

#[derive(Debug, Serialize)]
struct Member {
    name: String,
    status: Status,
}

#[derive(Debug, Serialize)]
struct GroupDetail {
    ident: String,
    name: String,
    seeds: Vec<String>,
    members: Vec<Member>,
}

fn summaries(snapshot: &DerivedSnapshot, all: bool) -> Vec<GroupSummary> {
    snapshot
        .groups
        .values()
        .filter(|group| all || !group.hidden)
        .map(|group| GroupSummary {
            ident: group.ident.clone(),
            name: group.name.clone(),
            hidden: group.hidden,
            packages: group.packages.len(),
            done: group
                .packages
                .iter()
                .filter(|name| snapshot.status_of(name).is_some_and(Status::is_done))
                .count(),
        })
        .collect()
}

fn detail(snapshot: &DerivedSnapshot, ident: &str) -> anyhow::Result<GroupDetail> {
    let group = snapshot
        .group(ident)
        .with_context(|| format!("cannot show group '{ident}'"))?;
    let members = snapshot
        .by_weight()
        .into_iter()
        .filter(|p| group.packages.contains(&p.name))
        .map(|p| Member {
            name: p.name.clone(),
            status: p.status,
        })
        .collect();
    Ok(GroupDetail {
        ident: group.ident.clone(),
        name: group.name.clone(),
        seeds: group.seeds.iter().cloned().collect(),
        members,
    })
}

/// Execute `portdb group`.
pub fn run_group(args: &GroupArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    match &args.ident {
        Some(ident) => render(output, &detail(&snapshot, ident)?, render_detail),
        None => render_mode(output, &summaries(&snapshot, args.all), render_list_text, render_list_pretty),
    }
}

fn render_list_text(groups: &Vec<GroupSummary>, w: &mut dyn Write) -> std::io::Result<()> {
    for group in groups {
        writeln!(w, "{}\t{}/{}\t{}", group.ident, group.done, group.packages, group.name)?;
    }
    Ok(())
}

fn render_list_pretty(groups: &Vec<GroupSummary>, w: &mut dyn Write) -> std::io::Result<()> {
    if groups.is_empty() {
        return writeln!(w, "No groups defined.");
    }
    pretty_section(w, &format!("Groups ({})", groups.len()))?;
    let width = groups.iter().map(|g| g.ident.len()).max().unwrap_or(0);
    for group in groups {
        let hidden = if group.hidden { " (hidden)" } else { "" };
        writeln!(
            w,
            "  {:<width$}  {:>5}/{:<5} {}{hidden}",
            group.ident, group.done, group.packages, group.name
        )?;
    }
    Ok(())
}

fn render_detail(group: &GroupDetail, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} ({})", group.name, group.ident))?;
    pretty_kv(w, "Seeds", group.seeds.join(", "))?;
    pretty_kv(w, "Packages", group.members.len().to_string())?;
    writeln!(w)?;
    for member in &group.members {
        writeln!(w, "  {} {}", member.status.abbrev(), member.name)?;
    }
    Ok(())
}
