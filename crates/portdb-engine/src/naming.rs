//! Naming-policy analysis.
//!
//! Distribution policy wants Python packages named with an explicit major
//! version (`python2-foo`, `python3-foo`). A requirement on a bare
//! `python-foo` is ambiguous: it resolves to whatever currently provides the
//! name. This module finds such requirements and sorts packages into three
//! disjoint buckets:
//!
//! - **misnamed**: the package itself ships misnamed artifacts;
//! - **blocked**: it requires a misnamed package without a version, so it
//!   cannot be fixed before the provider is;
//! - **ambiguous**: it has unversioned requirements on correctly named
//!   packages.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use portdb_core::config::NamingConfig;
use portdb_core::facts::FactStore;
use portdb_core::model::{Dependency, Status, requirement_name};

/// `python` as a word with no version right after it.
const UNVERSIONED_PYTHON: &str = r"(?i)(?:^|[^a-z0-9])python(?:$|[^a-z0-9.(])";

fn unversioned_python_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(UNVERSIONED_PYTHON).unwrap_or_else(|err| panic!("invalid regex {UNVERSIONED_PYTHON:?}: {err}"))
    })
}

/// `true` if a name mentions Python without saying which major version.
///
/// `python-foo`, `/usr/bin/python` and `python` are ambiguous;
/// `python3-foo`, `python2.7`, `python(abi) = 3.9` and `python3dist(foo)`
/// are not.
#[must_use]
pub fn is_ambiguous_name(name: &str) -> bool {
    unversioned_python_re().is_match(name)
}

/// Which naming bucket a package falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingBucket {
    Misnamed,
    Blocked,
    Ambiguous,
}

impl NamingBucket {
    pub const ALL: [Self; 3] = [Self::Misnamed, Self::Blocked, Self::Ambiguous];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Misnamed => "misnamed",
            Self::Blocked => "blocked",
            Self::Ambiguous => "ambiguous",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Misnamed => "Packages with misnamed subpackages",
            Self::Blocked => "Packages requiring a misnamed package",
            Self::Ambiguous => "Packages with ambiguous requirements",
        }
    }
}

impl fmt::Display for NamingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unversioned requirements found in the package set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingReport {
    /// Packages flagged misnamed by the harvested facts.
    pub misnamed: BTreeSet<String>,
    /// `P -> {Q}`: misnamed packages `P` requires without a version.
    pub blocked_requires: BTreeMap<String, BTreeSet<String>>,
    /// `P -> {Q}`: other packages `P` requires without a version.
    pub unversioned_requires: BTreeMap<String, BTreeSet<String>>,
    /// `Q -> {P}`: packages requiring `Q` without a version.
    pub unversioned_requirers: BTreeMap<String, BTreeSet<String>>,
}

impl NamingReport {
    /// Bucket of a package, if any. Misnamed beats blocked beats ambiguous.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<NamingBucket> {
        if self.misnamed.contains(name) {
            Some(NamingBucket::Misnamed)
        } else if self.blocked_requires.contains_key(name) {
            Some(NamingBucket::Blocked)
        } else if self.unversioned_requires.contains_key(name) {
            Some(NamingBucket::Ambiguous)
        } else {
            None
        }
    }

    /// Sorted members of one bucket.
    #[must_use]
    pub fn members(&self, bucket: NamingBucket) -> Vec<&str> {
        let candidates: Box<dyn Iterator<Item = &String>> = match bucket {
            NamingBucket::Misnamed => Box::new(self.misnamed.iter()),
            NamingBucket::Blocked => Box::new(self.blocked_requires.keys()),
            NamingBucket::Ambiguous => Box::new(self.unversioned_requires.keys()),
        };
        candidates
            .map(String::as_str)
            .filter(|name| self.bucket(name) == Some(bucket))
            .collect()
    }

    /// Whether `requirer` names `requirement` without a version.
    #[must_use]
    pub fn is_unversioned(&self, requirer: &str, requirement: &str) -> bool {
        self.unversioned_requirers
            .get(requirement)
            .is_some_and(|requirers| requirers.contains(requirer))
    }

    /// Set the `unversioned` flag on matching dependency rows.
    pub fn mark_dependencies(&self, dependencies: &mut [Dependency]) {
        for dep in dependencies {
            dep.unversioned = self.is_unversioned(&dep.requirer, &dep.requirement);
        }
    }
}

/// Scan every package's requirement lists for unversioned requirements.
///
/// `py3-only` packages are skipped, as are artifacts whose own name is
/// ambiguous and requirements ending in a documentation suffix.
#[must_use]
#[instrument(skip_all, fields(packages = store.package_count()))]
pub fn analyze(
    store: &FactStore,
    status_of: impl Fn(&str) -> Option<Status>,
    config: &NamingConfig,
) -> NamingReport {
    let mut report = NamingReport {
        misnamed: store
            .packages()
            .filter(|p| p.is_misnamed())
            .map(|p| p.name.clone())
            .collect(),
        ..NamingReport::default()
    };

    for package in store.packages() {
        if status_of(&package.name) == Some(Status::Py3Only) {
            continue;
        }
        let requirer = package.name.as_str();

        for (rpm_name, rpm) in &package.rpms {
            if is_ambiguous_name(rpm_name) {
                debug!(package = requirer, artifact = %rpm_name, "skipping ambiguously named artifact");
                continue;
            }
            for requirement in rpm.requirements.all() {
                let Some(bare) = requirement_name(requirement) else {
                    continue;
                };
                if !is_ambiguous_name(bare)
                    || config.doc_suffixes.iter().any(|suffix| bare.ends_with(suffix.as_str()))
                {
                    continue;
                }
                let Some(target) = store.resolve(bare) else {
                    continue;
                };
                if target.srpm == requirer {
                    continue;
                }
                let Some(provider) = store.package(&target.srpm) else {
                    continue;
                };

                report
                    .unversioned_requirers
                    .entry(provider.name.clone())
                    .or_default()
                    .insert(requirer.to_string());
                let bucket = if provider.is_misnamed() {
                    &mut report.blocked_requires
                } else {
                    &mut report.unversioned_requires
                };
                bucket
                    .entry(requirer.to_string())
                    .or_default()
                    .insert(provider.name.clone());
            }
        }
    }

    debug!(
        misnamed = report.misnamed.len(),
        blocked = report.members(NamingBucket::Blocked).len(),
        ambiguous = report.members(NamingBucket::Ambiguous).len(),
        "naming analysis done"
    );
    report
}
