//! `portdb show`: everything derived about one package.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use portdb_core::model::{Dependency, Priority, Status};
use portdb_engine::DerivedSnapshot;
use portdb_engine::snapshot::PackageState;

use super::DataSource;
use crate::output::{OutputMode, pretty_kv, pretty_section, render};

/// Arguments for `portdb show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Source package name.
    pub package: String,
}

#[derive(Debug, Serialize)]
struct Related {
    name: String,
    status: Option<Status>,
    run_time: bool,
    build_time: bool,
    unversioned: bool,
}

#[derive(Debug, Serialize)]
struct PackageDetail<'a> {
    #[serde(flatten)]
    package: &'a PackageState,
    description: &'static str,
    instructions: &'static str,
    requirements: Vec<Related>,
    requirers: Vec<Related>,
    pending_requirements: Vec<String>,
    pending_requirers: Vec<String>,
}

fn related<'a>(
    snapshot: &DerivedSnapshot,
    rows: impl Iterator<Item = &'a Dependency>,
    other: impl Fn(&'a Dependency) -> &'a str,
) -> Vec<Related> {
    rows.map(|dep| {
        let name = other(dep);
        Related {
            name: name.to_string(),
            status: snapshot.status_of(name),
            run_time: dep.run_time,
            build_time: dep.build_time,
            unversioned: dep.unversioned,
        }
    })
    .collect()
}

fn names(packages: &[&PackageState]) -> Vec<String> {
    packages.iter().map(|p| p.name.clone()).collect()
}

fn build_detail<'a>(snapshot: &'a DerivedSnapshot, name: &'a str) -> anyhow::Result<PackageDetail<'a>> {
    let package = snapshot
        .package(name)
        .with_context(|| format!("cannot show '{name}'"))?;
    Ok(PackageDetail {
        package,
        description: package.status.description(),
        instructions: package.status.instructions(),
        requirements: related(snapshot, snapshot.requirements_of(name), |d| d.requirement.as_str()),
        requirers: related(snapshot, snapshot.requirers_of(name), |d| d.requirer.as_str()),
        pending_requirements: names(&snapshot.pending_requirements(name)),
        pending_requirers: names(&snapshot.pending_requirers(name)),
    })
}

/// Execute `portdb show`.
pub fn run_show(args: &ShowArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let detail = build_detail(&snapshot, &args.package)?;
    render(output, &detail, render_human)
}

fn flags(rel: &Related) -> String {
    let mut flags = Vec::new();
    if rel.build_time && !rel.run_time {
        flags.push("build");
    }
    if rel.unversioned {
        flags.push("unversioned");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    }
}

fn render_related(w: &mut dyn Write, heading: &str, rows: &[Related]) -> std::io::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, &format!("{heading} ({})", rows.len()))?;
    for rel in rows {
        let abbrev = rel.status.map_or("?", Status::abbrev);
        writeln!(w, "  {abbrev} {}{}", rel.name, flags(rel))?;
    }
    Ok(())
}

fn render_human(detail: &PackageDetail<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let package = detail.package;
    pretty_section(w, &package.name)?;
    pretty_kv(w, "Status", package.status.name())?;
    if package.overridden {
        pretty_kv(w, "Derived", package.derived.name())?;
    }
    if let Some(note) = &package.note {
        pretty_kv(w, "Note", note)?;
    }
    if package.nonblocking {
        pretty_kv(w, "Nonblocking", "yes")?;
    }
    if package.priority != Priority::Unknown {
        pretty_kv(w, "Priority", package.priority.as_str())?;
    }
    if let Some(deadline) = package.deadline {
        pretty_kv(w, "Deadline", deadline.to_string())?;
    }
    pretty_kv(w, "Tier", package.tier.to_string())?;
    if !package.groups.is_empty() {
        let groups: Vec<&str> = package.groups.iter().map(String::as_str).collect();
        pretty_kv(w, "Groups", groups.join(", "))?;
    }
    if let Some(bucket) = package.naming {
        pretty_kv(w, "Naming", bucket.description())?;
    }
    pretty_kv(w, "About", detail.description)?;
    pretty_kv(w, "Next step", detail.instructions)?;

    if !package.rpms.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Artifacts ({})", package.rpms.len()))?;
        for rpm in &package.rpms {
            writeln!(w, "  {rpm}")?;
        }
    }
    render_related(w, "Requires", &detail.requirements)?;
    render_related(w, "Required by", &detail.requirers)?;

    if !package.links.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Links")?;
        for link in &package.links {
            match &link.note {
                Some(note) => writeln!(w, "  {:?}: {} ({note})", link.kind, link.url)?,
                None => writeln!(w, "  {:?}: {}", link.kind, link.url)?,
            }
        }
        if let Some(updated) = package.last_link_update {
            pretty_kv(w, "Last update", updated.format("%Y-%m-%d").to_string())?;
        }
    }
    if !package.tracking_bugs.is_empty() {
        let trackers: Vec<&str> = package.tracking_bugs.iter().map(String::as_str).collect();
        pretty_kv(w, "Trackers", trackers.join(", "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use portdb_core::config::PortdbConfig;
    use portdb_core::facts::FactStore;
    use portdb_core::model::PackageFacts;
    use portdb_engine::derive;

    fn snapshot() -> DerivedSnapshot {
        let mut app = PackageFacts::new("app");
        app.deps.insert("lib".to_string());
        app.build_deps.insert("tool".to_string());
        let packages = [app, PackageFacts::new("lib"), PackageFacts::new("tool")]
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
    fn detail_lists_both_directions() {
        let snap = snapshot();
        let detail = build_detail(&snap, "app").unwrap();
        let requirements: Vec<&str> = detail.requirements.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(requirements, vec!["lib", "tool"]);
        assert!(detail.requirers.is_empty());
        assert_eq!(detail.pending_requirements, vec!["lib", "tool"]);

        let lib = build_detail(&snap, "lib").unwrap();
        assert_eq!(lib.requirers[0].name, "app");
    }

    #[test]
    fn unknown_package_keeps_error_code() {
        let snap = snapshot();
        let err = build_detail(&snap, "ghost").unwrap_err();
        let cli = crate::output::CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
    }

    #[test]
    fn human_output_marks_build_only_requirements() {
        let snap = snapshot();
        let detail = build_detail(&snap, "app").unwrap();
        let mut out = Vec::new();
        render_human(&detail, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Requires (2)"));
        assert!(text.contains("tool [build]"));
        assert!(!text.contains("lib [build]"));
    }
}
