//! `portdb naming`: packages in each naming-policy bucket.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use clap::Args;
use serde::Serialize;

use portdb_engine::DerivedSnapshot;
use portdb_engine::naming::{NamingBucket, NamingReport};

use super::DataSource;
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `portdb naming`.
#[derive(Args, Debug, Default)]
pub struct NamingArgs {
    /// Only show this bucket.
    #[arg(long, value_enum)]
    pub bucket: Option<BucketArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BucketArg {
    Misnamed,
    Blocked,
    Ambiguous,
}

impl From<BucketArg> for NamingBucket {
    fn from(arg: BucketArg) -> Self {
        match arg {
            BucketArg::Misnamed => Self::Misnamed,
            BucketArg::Blocked => Self::Blocked,
            BucketArg::Ambiguous => Self::Ambiguous,
        }
    }
}

#[derive(Debug, Serialize)]
struct BucketEntry {
    name: String,
    /// Misnamed: who requires it unversioned. Otherwise: what it requires
    /// unversioned.
    related: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BucketReport {
    bucket: NamingBucket,
    description: &'static str,
    packages: Vec<BucketEntry>,
}

fn related_of(report: &NamingReport, bucket: NamingBucket, name: &str) -> Vec<String> {
    let source: &BTreeMap<String, BTreeSet<String>> = match bucket {
        NamingBucket::Misnamed => &report.unversioned_requirers,
        NamingBucket::Blocked => &report.blocked_requires,
        NamingBucket::Ambiguous => &report.unversioned_requires,
    };
    source
        .get(name)
        .map(|names| names.iter().cloned().collect())
        .unwrap_or_default()
}

fn build_report(snapshot: &DerivedSnapshot, only: Option<NamingBucket>) -> Vec<BucketReport> {
    NamingBucket::ALL
        .into_iter()
        .filter(|bucket| only.is_none_or(|wanted| wanted == *bucket))
        .map(|bucket| BucketReport {
            bucket,
            description: bucket.description(),
            packages: snapshot
                .naming
                .members(bucket)
                .into_iter()
                .map(|name| BucketEntry {
                    name: name.to_string(),
                    related: related_of(&snapshot.naming, bucket, name),
                })
                .collect(),
        })
        .collect()
}

/// Execute `portdb naming`.
pub fn run_naming(args: &NamingArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let report = build_report(&snapshot, args.bucket.map(NamingBucket::from));
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &Vec<BucketReport>, w: &mut dyn Write) -> std::io::Result<()> {
    for bucket in report {
        for entry in &bucket.packages {
            writeln!(w, "{}\t{}\t{}", bucket.bucket, entry.name, entry.related.join(","))?;
        }
    }
    Ok(())
}

fn render_pretty(report: &Vec<BucketReport>, w: &mut dyn Write) -> std::io::Result<()> {
    for (idx, bucket) in report.iter().enumerate() {
        if idx > 0 {
            writeln!(w)?;
        }
        pretty_section(w, &format!("{} ({})", bucket.description, bucket.packages.len()))?;
        for entry in &bucket.packages {
            if entry.related.is_empty() {
                writeln!(w, "  {}", entry.name)?;
            } else {
                writeln!(w, "  {} ({})", entry.name, entry.related.join(", "))?;
            }
        }
    }
    Ok(())
}
