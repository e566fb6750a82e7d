//! Status classification.
//!
//! # Overview
//!
//! Every package gets exactly one [`Status`] in four passes:
//!
//! 1. **Artifact rules** ([`initial_status`]): the built artifacts are
//!    partitioned by the Python major versions they need and the package is
//!    labelled `mispackaged`, `py3-only`, `legacy-leaf`, `released` or
//!    `idle`.
//! 2. **Curation rules**: outdated Python ABIs and open bugs on the
//!    configured tracker turn `idle`/`released` packages into
//!    `mispackaged`.
//! 3. **Overrides**: a curated status wins when it outranks the derived
//!    one. Lowering a finished package is applied too, with a warning.
//! 4. **Blocking**: a worklist fixpoint turns `idle` packages with an
//!    unfinished, blocking run-time requirement into `blocked`.
//!
//! Source artifacts (`arch = "src"`) never count as built artifacts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use portdb_core::config::{LeafPolicy, PortdbConfig};
use portdb_core::error::PortdbError;
use portdb_core::facts::FactStore;
use portdb_core::model::{PackageFacts, PyNeeds, RpmFacts, Status};

pub const SPLIT_NOTE: &str = "should be split into python2/python3 subpackages";
pub const MISSING_BINARIES_NOTE: &str =
    "Python 3 package missing binaries available in Python 2 package.";

/// Trailing Python version on an executable name: `pip-2.7`, `pip3`, `nosetests-3.9`.
const VERSION_SUFFIX: &str = r"^(?P<stem>.+?)-?[23](?:\.[0-9]+)?$";

fn version_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(VERSION_SUFFIX).unwrap_or_else(|err| panic!("invalid regex {VERSION_SUFFIX:?}: {err}"))
    })
}

/// Outcome of classifying one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStatus {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub nonblocking: bool,
    /// Status before overrides and blocking.
    pub derived: Status,
    /// A curated override set `status`.
    pub overridden: bool,
}

/// Statuses of every package plus what went wrong along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub packages: BTreeMap<String, PackageStatus>,
    pub warnings: Vec<String>,
}

/// Status, note and nonblocking flag from the artifact rules alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initial {
    pub status: Status,
    pub note: Option<String>,
    pub nonblocking: bool,
}

impl Initial {
    const fn plain(status: Status) -> Self {
        Self {
            status,
            note: None,
            nonblocking: false,
        }
    }
}

/// Classify every package in the store.
///
/// # Errors
///
/// Returns [`PortdbError::FixpointDiverged`] if blocking propagation does
/// not settle within the configured round cap.
#[instrument(skip_all, fields(packages = store.package_count()))]
pub fn classify(store: &FactStore, config: &PortdbConfig) -> Result<Classification, PortdbError> {
    let mut classification = Classification::default();

    for package in store.packages() {
        let mut initial = initial_status(store, package, config);
        apply_curation_rules(store, package, config, &mut initial);
        let resolved = resolve_override(package, initial, &mut classification.warnings);
        classification.packages.insert(package.name.clone(), resolved);
    }

    let rounds = propagate_blocked(store, &mut classification.packages, config.classify.max_rounds)?;
    info!(rounds, "classification settled");
    Ok(classification)
}

/// Apply the artifact rules to one package.
#[must_use]
pub fn initial_status(store: &FactStore, package: &PackageFacts, config: &PortdbConfig) -> Initial {
    let built: Vec<(&String, &RpmFacts)> = package
        .rpms
        .iter()
        .filter(|(_, rpm)| !rpm.is_source())
        .collect();

    if let Some((name, _)) = built.iter().find(|(_, rpm)| rpm.needs() == PyNeeds::Both) {
        debug!(package = %package.name, artifact = %name, "artifact needs both Python versions");
        return Initial {
            status: Status::Mispackaged,
            note: Some(format!("{name} needs Python 2 and Python 3; it {SPLIT_NOTE}.")),
            nonblocking: false,
        };
    }

    let py2: Vec<(&String, &RpmFacts)> = built
        .iter()
        .copied()
        .filter(|(_, rpm)| rpm.needs().needs_py2())
        .collect();
    let py3: Vec<(&String, &RpmFacts)> = built
        .iter()
        .copied()
        .filter(|(_, rpm)| rpm.needs().needs_py3())
        .collect();

    if py2.is_empty() {
        return Initial::plain(if py3.is_empty() { Status::Idle } else { Status::Py3Only });
    }
    if py3.len() < py2.len() {
        return Initial::plain(Status::Idle);
    }

    let missing = missing_binaries(&py2, &py3, &config.classify.binary_dirs);
    if !missing.is_empty() {
        debug!(package = %package.name, ?missing, "Python 3 artifacts lack binaries");
        return Initial {
            status: Status::Mispackaged,
            note: Some(MISSING_BINARIES_NOTE.to_string()),
            nonblocking: true,
        };
    }

    let leaf = py2
        .iter()
        .all(|(rpm, _)| is_leaf(store, &package.name, rpm, config.classify.leaf_policy));
    Initial::plain(if leaf { Status::LegacyLeaf } else { Status::Released })
}

/// Strip a trailing Python version from an executable name.
#[must_use]
pub fn strip_version(basename: &str) -> &str {
    version_suffix_re()
        .captures(basename)
        .and_then(|caps| caps.name("stem"))
        .map_or(basename, |stem| stem.as_str())
}

/// Version-stripped executable names the py2 artifacts ship and the py3
/// artifacts do not.
fn missing_binaries(
    py2: &[(&String, &RpmFacts)],
    py3: &[(&String, &RpmFacts)],
    binary_dirs: &[String],
) -> BTreeSet<String> {
    let binaries = |artifacts: &[(&String, &RpmFacts)]| -> BTreeSet<String> {
        artifacts
            .iter()
            .flat_map(|(_, rpm)| rpm.files.iter())
            .filter_map(|path| {
                binary_dirs
                    .iter()
                    .find_map(|dir| path.strip_prefix(dir.as_str()))
                    .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|name| strip_version(name).to_string())
            .collect()
    };

    let py3_only: Vec<(&String, &RpmFacts)> = py3
        .iter()
        .copied()
        .filter(|(_, rpm)| !rpm.needs().needs_py2())
        .collect();
    let py2_only: Vec<(&String, &RpmFacts)> = py2
        .iter()
        .copied()
        .filter(|(_, rpm)| !rpm.needs().needs_py3())
        .collect();

    let have = binaries(&py3_only);
    binaries(&py2_only)
        .into_iter()
        .filter(|name| !have.contains(name))
        .collect()
}

fn is_leaf(store: &FactStore, srpm: &str, rpm: &str, policy: LeafPolicy) -> bool {
    let mut requirers = store.requirers_of_artifact(rpm);
    match policy {
        LeafPolicy::AlmostLeaf => requirers.all(|requirer| requirer == srpm),
        LeafPolicy::Leaf => requirers.next().is_none(),
    }
}

fn apply_curation_rules(
    store: &FactStore,
    package: &PackageFacts,
    config: &PortdbConfig,
    initial: &mut Initial,
) {
    if !matches!(
        initial.status,
        Status::Idle | Status::Blocked | Status::Released
    ) {
        return;
    }

    if initial.note.is_none() && package.note.is_none() {
        let outdated = config.classify.outdated_abis.iter().find(|abi| {
            package
                .rpms
                .values()
                .any(|rpm| rpm.py_deps.contains_key(abi.as_str()))
        });
        if let Some(abi) = outdated {
            debug!(package = %package.name, abi = %abi, "outdated Python ABI");
            initial.status = Status::Mispackaged;
            initial.note = Some(format!(
                "The package depends on {abi}. It should be rebuilt for the current Python 3."
            ));
            return;
        }
    }

    if let Some(tracker) = config.bugs.mispackaged_tracker.as_deref() {
        let bug = store
            .bugs_for(&package.name)
            .iter()
            .find(|bug| bug.is_open() && bug.trackers.contains(tracker));
        if let Some(bug) = bug {
            debug!(package = %package.name, bug = %bug.url, "open bug on mispackaged tracker");
            initial.status = Status::Mispackaged;
            initial.note = Some(bug.url.clone());
        }
    }
}

fn resolve_override(package: &PackageFacts, initial: Initial, warnings: &mut Vec<String>) -> PackageStatus {
    let derived = initial.status;
    let curated = package.status.filter(|s| *s != Status::Unknown);

    let applies = match curated {
        Some(wanted)
            if derived.is_done() && (!wanted.is_done() || wanted.rank() < derived.rank()) =>
        {
            let message = format!(
                "override lowers {} from {derived} to {wanted}",
                package.name
            );
            warn!(package = %package.name, %derived, %wanted, "override lowers a finished package");
            warnings.push(message);
            true
        }
        Some(wanted) if wanted.rank() >= derived.rank() => true,
        Some(wanted) => {
            debug!(package = %package.name, %derived, %wanted, "override outranked, ignored");
            false
        }
        None => false,
    };

    match curated {
        Some(wanted) if applies => PackageStatus {
            status: wanted,
            note: package.note.clone(),
            nonblocking: package.nonblocking,
            derived,
            overridden: true,
        },
        _ => PackageStatus {
            status: derived,
            note: initial.note.or_else(|| package.note.clone()),
            nonblocking: package.nonblocking || initial.nonblocking,
            derived,
            overridden: false,
        },
    }
}

/// Whether a requirement in `status` holds back the packages needing it.
const fn blocks(status: &PackageStatus) -> bool {
    !status.status.is_done() && !status.nonblocking
}

/// Turn idle packages with a blocking run-time requirement into `blocked`.
///
/// Returns the number of rounds used. Overridden packages keep their
/// status.
fn propagate_blocked(
    store: &FactStore,
    packages: &mut BTreeMap<String, PackageStatus>,
    max_rounds: Option<usize>,
) -> Result<usize, PortdbError> {
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for name in store.package_names() {
        for requirement in store.run_time_requirements(name) {
            dependents.entry(requirement).or_default().push(name);
        }
    }

    let promotable = |packages: &BTreeMap<String, PackageStatus>, name: &str| {
        packages
            .get(name)
            .is_some_and(|p| p.status == Status::Idle && !p.overridden)
    };

    let mut frontier: BTreeSet<&str> = {
        let current: &BTreeMap<String, PackageStatus> = packages;
        store
            .package_names()
            .filter(|name| promotable(current, name))
            .filter(|name| {
                store
                    .run_time_requirements(name)
                    .any(|requirement| current.get(requirement).is_some_and(blocks))
            })
            .collect()
    };

    let cap = max_rounds.unwrap_or(store.package_count() + 1);
    let mut rounds = 0;
    while !frontier.is_empty() {
        rounds += 1;
        if rounds > cap {
            return Err(PortdbError::FixpointDiverged {
                stage: "blocked propagation",
                rounds: cap,
            });
        }

        let mut next = BTreeSet::new();
        for name in frontier {
            let Some(package) = packages.get_mut(name) else {
                continue;
            };
            package.status = Status::Blocked;
            debug!(package = name, "blocked");
            if package.nonblocking {
                continue;
            }
            for &dependent in dependents.get(name).into_iter().flatten() {
                if promotable(packages, dependent) {
                    next.insert(dependent);
                }
            }
        }
        frontier = next;
    }

    Ok(rounds)
}
