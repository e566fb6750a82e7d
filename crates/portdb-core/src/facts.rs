//! Immutable snapshot of raw package facts.
//!
//! [`FactStore`] owns the harvested packages, group definitions and bug
//! records of one load cycle, plus two indexes computed once at
//! construction:
//!
//! - an artifact index resolving artifact names and provided capabilities
//!   to the artifact (and its srpm) that satisfies them;
//! - the package-level [`Dependency`] rows, merged from srpm-level
//!   `deps`/`build_deps` lists and from artifact-level requirements.
//!
//! Bug records are also attached to their packages as `bug` links and
//! tracking-bug memberships.
//!
//! Names that resolve to nothing are dropped (logged at `debug`).

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::model::{BugRecord, Dependency, GroupDef, PackageFacts, requirement_name};

/// Location of a built artifact: its srpm and its own name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactRef {
    pub srpm: String,
    pub rpm: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EdgeKinds {
    run_time: bool,
    build_time: bool,
}

/// Raw facts of one load cycle. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    collection: String,
    packages: BTreeMap<String, PackageFacts>,
    groups: BTreeMap<String, GroupDef>,
    bugs: BTreeMap<String, Vec<BugRecord>>,
    artifact_index: BTreeMap<String, ArtifactRef>,
    /// requirer -> requirement -> kinds
    edges: BTreeMap<String, BTreeMap<String, EdgeKinds>>,
    /// artifact name -> srpms requiring it (run time or build time)
    artifact_requirers: BTreeMap<String, BTreeSet<String>>,
}

impl FactStore {
    /// Build a store and its indexes.
    ///
    /// Package names are taken from the map keys; the `name` field of each
    /// [`PackageFacts`] is overwritten to match.
    #[must_use]
    #[instrument(skip_all, fields(packages = packages.len()))]
    pub fn new(
        collection: impl Into<String>,
        mut packages: BTreeMap<String, PackageFacts>,
        groups: BTreeMap<String, GroupDef>,
        bugs: BTreeMap<String, Vec<BugRecord>>,
    ) -> Self {
        for (name, package) in &mut packages {
            package.name.clone_from(name);
            if let Some(records) = bugs.get(name) {
                package.attach_bugs(records);
            }
        }
        let groups = groups
            .into_iter()
            .map(|(ident, mut group)| {
                group.ident.clone_from(&ident);
                if group.name.is_empty() {
                    group.name.clone_from(&ident);
                }
                (ident, group)
            })
            .collect();

        let artifact_index = build_artifact_index(&packages);
        let mut store = Self {
            collection: collection.into(),
            packages,
            groups,
            bugs,
            artifact_index,
            edges: BTreeMap::new(),
            artifact_requirers: BTreeMap::new(),
        };
        store.build_edges();
        store
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn package(&self, name: &str) -> Option<&PackageFacts> {
        self.packages.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// All packages in name order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageFacts> {
        self.packages.values()
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    #[must_use]
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupDef> {
        self.groups.values()
    }

    #[must_use]
    pub fn group(&self, ident: &str) -> Option<&GroupDef> {
        self.groups.get(ident)
    }

    /// Bug records attached to a package (empty if none).
    #[must_use]
    pub fn bugs_for(&self, name: &str) -> &[BugRecord] {
        self.bugs.get(name).map_or(&[], Vec::as_slice)
    }

    /// Resolve a requirement to the artifact providing it.
    ///
    /// Version constraints are ignored: `python3-six >= 1.10` resolves like
    /// `python3-six`.
    #[must_use]
    pub fn resolve(&self, requirement: &str) -> Option<&ArtifactRef> {
        self.artifact_index.get(requirement_name(requirement)?)
    }

    /// Srpms requiring an artifact. The artifact's own srpm is listed when
    /// a sibling artifact requires it.
    pub fn requirers_of_artifact(&self, rpm: &str) -> impl Iterator<Item = &str> {
        self.artifact_requirers
            .get(rpm)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// All dependency rows, sorted by `(requirer, requirement)`.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.edges
            .iter()
            .flat_map(|(requirer, reqs)| {
                reqs.iter().map(move |(requirement, kinds)| Dependency {
                    requirer: requirer.clone(),
                    requirement: requirement.clone(),
                    run_time: kinds.run_time,
                    build_time: kinds.build_time,
                    unversioned: false,
                })
            })
            .collect()
    }

    /// Names of the run-time requirements of a package.
    pub fn run_time_requirements(&self, name: &str) -> impl Iterator<Item = &str> {
        self.requirements_where(name, |kinds| kinds.run_time)
    }

    /// Names of every (run-time or build-time) requirement of a package.
    pub fn requirements(&self, name: &str) -> impl Iterator<Item = &str> {
        self.requirements_where(name, |kinds| kinds.run_time || kinds.build_time)
    }

    fn requirements_where(
        &self,
        name: &str,
        keep: fn(&EdgeKinds) -> bool,
    ) -> impl Iterator<Item = &str> {
        self.edges
            .get(name)
            .into_iter()
            .flatten()
            .filter(move |(_, kinds)| keep(kinds))
            .map(|(requirement, _)| requirement.as_str())
    }

    fn build_edges(&mut self) {
        let mut edges: BTreeMap<String, BTreeMap<String, EdgeKinds>> = BTreeMap::new();
        let mut artifact_requirers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        let mut add = |requirer: &str, requirement: &str, build_time: bool| {
            let kinds = edges
                .entry(requirer.to_string())
                .or_default()
                .entry(requirement.to_string())
                .or_default();
            if build_time {
                kinds.build_time = true;
            } else {
                kinds.run_time = true;
            }
        };

        for package in self.packages.values() {
            let requirer = package.name.as_str();

            // srpm-level lists do not say which artifact is needed, so every
            // artifact of the requirement counts as required.
            for (deps, build_time) in [(&package.deps, false), (&package.build_deps, true)] {
                for requirement in deps {
                    if requirement == requirer {
                        continue;
                    }
                    let Some(target) = self.packages.get(requirement) else {
                        debug!(requirer, requirement = %requirement, "ignoring unknown dependency");
                        continue;
                    };
                    add(requirer, requirement, build_time);
                    for rpm in target.rpms.keys() {
                        artifact_requirers
                            .entry(rpm.clone())
                            .or_default()
                            .insert(requirer.to_string());
                    }
                }
            }

            let run_time = package
                .rpms
                .iter()
                .flat_map(|(rpm, facts)| facts.requirements.run_time().map(move |r| (Some(rpm), r)));
            let build_time = package.build_requires.iter().map(|r| (None, r.as_str()));

            for (from_rpm, name) in run_time.chain(build_time) {
                let Some(target) = self.resolve(name) else {
                    continue;
                };
                if from_rpm.is_some_and(|rpm| *rpm == target.rpm) {
                    continue;
                }
                artifact_requirers
                    .entry(target.rpm.clone())
                    .or_default()
                    .insert(requirer.to_string());
                if target.srpm != requirer {
                    add(requirer, &target.srpm, from_rpm.is_none());
                }
            }
        }

        self.edges = edges;
        self.artifact_requirers = artifact_requirers;
    }
}

/// Map artifact names and provided capabilities to their artifact.
///
/// Artifact names win over capabilities; among competing providers of one
/// capability the first in name order wins, keeping resolution stable.
fn build_artifact_index(packages: &BTreeMap<String, PackageFacts>) -> BTreeMap<String, ArtifactRef> {
    let mut index = BTreeMap::new();
    for package in packages.values() {
        for rpm in package.rpms.keys() {
            index.insert(
                rpm.clone(),
                ArtifactRef {
                    srpm: package.name.clone(),
                    rpm: rpm.clone(),
                },
            );
        }
    }
    for package in packages.values() {
        for (rpm, facts) in &package.rpms {
            for capability in &facts.provides {
                index.entry(capability.clone()).or_insert_with(|| ArtifactRef {
                    srpm: package.name.clone(),
                    rpm: rpm.clone(),
                });
            }
        }
    }
    index
}
