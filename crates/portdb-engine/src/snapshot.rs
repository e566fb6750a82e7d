//! Derived snapshot: the output of one derivation over a fact store.
//!
//! [`derive`] runs every stage in order (classification, group closures,
//! naming analysis, graph tiering) and returns an immutable
//! [`DerivedSnapshot`]. Readers share a snapshot through an [`Arc`];
//! [`SnapshotCell`] swaps in a new one after a reload.
//!
//! Every collection in a snapshot is ordered, so two derivations over the
//! same facts serialize to identical bytes.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use portdb_core::config::PortdbConfig;
use portdb_core::error::PortdbError;
use portdb_core::facts::FactStore;
use portdb_core::model::{Dependency, Link, Priority, Status};

use crate::classify::classify;
use crate::graph::{
    CondensedGraph, CycleReport, DepGraph, GroupMembership, TieredGraph, assign_tiers,
    group_closures, package_groups, report_cycles_with_breaks,
};
use crate::naming::{NamingBucket, NamingReport, analyze};

/// Everything derived about one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageState {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub nonblocking: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// Status from the artifact rules, before overrides and blocking.
    pub derived: Status,
    pub overridden: bool,
    pub is_misnamed: bool,
    /// Idents of the groups whose closure holds this package.
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<NamingBucket>,
    pub tier: usize,
    /// Built artifact names.
    #[serde(default)]
    pub rpms: Vec<String>,
    /// Harvested links plus one `bug` link per bug record.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Tracker bugs that this package's bugs block.
    #[serde(default)]
    pub tracking_bugs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_link_update: Option<DateTime<Utc>>,
}

/// Package counts per status, in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub counts: Vec<(Status, usize)>,
    pub total: usize,
    pub done: usize,
    pub percent_done: f64,
}

/// A package whose status differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusChange {
    pub name: String,
    /// `None` if the package is new.
    pub old: Option<Status>,
    /// `None` if the package is gone.
    pub new: Option<Status>,
}

/// Immutable result of one derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSnapshot {
    pub collection: String,
    pub packages: BTreeMap<String, PackageState>,
    pub groups: BTreeMap<String, GroupMembership>,
    /// Sorted by `(requirer, requirement)`.
    pub dependencies: Vec<Dependency>,
    pub naming: NamingReport,
    pub tiers: TieredGraph,
    pub cycles: Vec<CycleReport>,
    /// Surfaced problems, e.g. overrides lowering a finished package.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// BLAKE3 hash of the dependency graph's edge set.
    pub graph_hash: String,
}

/// Run the whole derivation pipeline.
///
/// # Errors
///
/// Returns [`PortdbError::FixpointDiverged`] if classification does not
/// settle within the configured round cap.
#[instrument(skip_all, fields(collection = store.collection()))]
pub fn derive(store: &FactStore, config: &PortdbConfig) -> Result<DerivedSnapshot, PortdbError> {
    let classification = classify(store, config)?;
    let statuses = &classification.packages;
    let status_of = |name: &str| statuses.get(name).map(|p| p.status);

    let groups = group_closures(store, status_of);
    let memberships = package_groups(&groups);

    let naming = analyze(store, status_of, &config.naming);
    let mut dependencies = store.dependencies();
    naming.mark_dependencies(&mut dependencies);

    let graph = DepGraph::from_dependencies(store.package_names(), &dependencies);
    let condensed = CondensedGraph::from_graph(&graph);
    let tiers = assign_tiers(&condensed, |name| status_of(name).is_some_and(Status::is_done));
    let cycles = report_cycles_with_breaks(&graph.unweighted());

    let packages: BTreeMap<String, PackageState> = store
        .packages()
        .filter_map(|facts| {
            let classified = statuses.get(&facts.name)?;
            Some((
                facts.name.clone(),
                PackageState {
                    name: facts.name.clone(),
                    status: classified.status,
                    note: classified.note.clone(),
                    nonblocking: classified.nonblocking,
                    priority: facts.priority.unwrap_or_default(),
                    deadline: facts.deadline,
                    derived: classified.derived,
                    overridden: classified.overridden,
                    is_misnamed: facts.is_misnamed(),
                    groups: memberships.get(&facts.name).cloned().unwrap_or_default(),
                    naming: naming.bucket(&facts.name),
                    tier: tiers.tier_of(&facts.name).unwrap_or(tiers.max_tier),
                    rpms: facts.rpms.keys().cloned().collect(),
                    links: facts.links.clone(),
                    tracking_bugs: facts.tracking_bugs.clone(),
                    last_link_update: facts.last_link_update(),
                },
            ))
        })
        .collect();

    let snapshot = DerivedSnapshot {
        collection: store.collection().to_string(),
        packages,
        groups,
        dependencies,
        naming,
        tiers,
        cycles,
        warnings: classification.warnings,
        graph_hash: graph.content_hash,
    };
    info!(
        packages = snapshot.packages.len(),
        groups = snapshot.groups.len(),
        cycles = snapshot.cycles.len(),
        warnings = snapshot.warnings.len(),
        "derived snapshot"
    );
    Ok(snapshot)
}

impl DerivedSnapshot {
    /// # Errors
    ///
    /// Returns [`PortdbError::PackageNotFound`] for an unknown name.
    pub fn package(&self, name: &str) -> Result<&PackageState, PortdbError> {
        self.packages
            .get(name)
            .ok_or_else(|| PortdbError::PackageNotFound(name.to_string()))
    }

    #[must_use]
    pub fn status_of(&self, name: &str) -> Option<Status> {
        self.packages.get(name).map(|p| p.status)
    }

    /// # Errors
    ///
    /// Returns [`PortdbError::GroupNotFound`] for an unknown ident.
    pub fn group(&self, ident: &str) -> Result<&GroupMembership, PortdbError> {
        self.groups
            .get(ident)
            .ok_or_else(|| PortdbError::GroupNotFound(ident.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`PortdbError::GroupNotFound`] for an unknown ident.
    pub fn group_members(&self, ident: &str) -> Result<&BTreeSet<String>, PortdbError> {
        self.group(ident).map(|group| &group.packages)
    }

    #[must_use]
    pub fn naming_bucket(&self, name: &str) -> Option<NamingBucket> {
        self.naming.bucket(name)
    }

    #[must_use]
    pub const fn tiered_graph(&self) -> &TieredGraph {
        &self.tiers
    }

    /// Dependency rows where `name` is the requirer.
    pub fn requirements_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Dependency> {
        self.dependencies.iter().filter(move |dep| dep.requirer == name)
    }

    /// Dependency rows where `name` is the requirement.
    pub fn requirers_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Dependency> {
        self.dependencies.iter().filter(move |dep| dep.requirement == name)
    }

    /// Requirements of `name` that are neither released nor dropped.
    #[must_use]
    pub fn pending_requirements<'a>(&'a self, name: &'a str) -> Vec<&'a PackageState> {
        self.pending(self.requirements_of(name).map(|dep| dep.requirement.as_str()))
    }

    /// Packages requiring `name` that are neither released nor dropped.
    #[must_use]
    pub fn pending_requirers<'a>(&'a self, name: &'a str) -> Vec<&'a PackageState> {
        self.pending(self.requirers_of(name).map(|dep| dep.requirer.as_str()))
    }

    fn pending<'a>(&'a self, names: impl Iterator<Item = &'a str>) -> Vec<&'a PackageState> {
        let mut pending: Vec<&PackageState> = names
            .filter_map(|name| self.packages.get(name))
            .filter(|p| !matches!(p.status, Status::Released | Status::Dropped))
            .collect();
        sort_by_weight(&mut pending);
        pending
    }

    /// All packages, heaviest status plus priority first, then by case-insensitive name.
    #[must_use]
    pub fn by_weight(&self) -> Vec<&PackageState> {
        let mut packages: Vec<&PackageState> = self.packages.values().collect();
        sort_by_weight(&mut packages);
        packages
    }

    /// Per-status counts in report order, plus the share of finished packages.
    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        let mut by_status: BTreeMap<Status, usize> = BTreeMap::new();
        for package in self.packages.values() {
            *by_status.entry(package.status).or_default() += 1;
        }
        let counts: Vec<(Status, usize)> = Status::EXPOSED
            .iter()
            .map(|status| (*status, by_status.get(status).copied().unwrap_or(0)))
            .collect();
        let total = self.packages.len();
        let done = self
            .packages
            .values()
            .filter(|p| p.status.is_done())
            .count();
        #[allow(clippy::cast_precision_loss)]
        let percent_done = if total == 0 {
            0.0
        } else {
            done as f64 * 100.0 / total as f64
        };
        StatusCounts {
            counts,
            total,
            done,
            percent_done,
        }
    }

    /// Pretty JSON export.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Status changes from `old` to `self`, sorted by name.
    #[must_use]
    pub fn status_changes(&self, old: &Self) -> Vec<StatusChange> {
        let names: BTreeSet<&str> = old
            .packages
            .keys()
            .chain(self.packages.keys())
            .map(String::as_str)
            .collect();
        names
            .into_iter()
            .filter_map(|name| {
                let before = old.status_of(name);
                let after = self.status_of(name);
                (before != after).then(|| StatusChange {
                    name: name.to_string(),
                    old: before,
                    new: after,
                })
            })
            .collect()
    }
}

fn sort_by_weight(packages: &mut [&PackageState]) {
    packages.sort_by_cached_key(|p| {
        (
            Reverse(p.status.weight() + p.priority.weight()),
            p.name.to_lowercase(),
            p.name.clone(),
        )
    });
}

/// Shared, swappable handle to the current snapshot.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<DerivedSnapshot>>,
}

impl SnapshotCell {
    #[must_use]
    pub fn new(snapshot: DerivedSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current snapshot. Stays valid after a later swap.
    #[must_use]
    pub fn load(&self) -> Arc<DerivedSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: DerivedSnapshot) -> Arc<DerivedSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }

    /// Derive from `store` and swap the result in.
    ///
    /// The current snapshot is untouched if derivation fails.
    ///
    /// # Errors
    ///
    /// Returns the derivation error.
    pub fn reload(&self, store: &FactStore, config: &PortdbConfig) -> Result<Arc<DerivedSnapshot>, PortdbError> {
        let snapshot = derive(store, config)?;
        self.replace(snapshot);
        Ok(self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portdb_core::model::{GroupDef, PackageFacts, RequirementLists, RpmFacts};

    fn rpm(version: u8, requires: &[&str]) -> RpmFacts {
        RpmFacts {
            arch: "noarch".to_string(),
            py_deps: [(format!("python(abi) = {version}.x"), version)].into_iter().collect(),
            requirements: RequirementLists {
                requires: requires.iter().map(|r| (*r).to_string()).collect(),
                ..RequirementLists::default()
            },
            ..RpmFacts::default()
        }
    }

    fn store() -> FactStore {
        store_with(|_| {})
    }

    fn store_with(curate: impl Fn(&mut PackageFacts)) -> FactStore {
        let mut packages = BTreeMap::new();
        for (name, artifact) in [
            ("app", ("python2-app", rpm(2, &["python2-lib"]))),
            ("lib", ("python2-lib", rpm(2, &[]))),
            ("done", ("python3-done", rpm(3, &[]))),
            ("Zed", ("python2-zed", rpm(2, &["python3-done"]))),
        ] {
            let mut facts = PackageFacts::new(name);
            facts.rpms.insert(artifact.0.to_string(), artifact.1);
            curate(&mut facts);
            packages.insert(name.to_string(), facts);
        }
        let groups = [(
            "web".to_string(),
            GroupDef {
                name: "Web".to_string(),
                packages: vec!["app".to_string()],
                ..GroupDef::default()
            },
        )]
        .into_iter()
        .collect();
        FactStore::new("test", packages, groups, BTreeMap::new())
    }

    #[test]
    fn snapshot_answers_queries() {
        let snap = derive(&store(), &PortdbConfig::default()).unwrap();
        assert_eq!(snap.status_of("app"), Some(Status::Blocked));
        assert_eq!(snap.status_of("lib"), Some(Status::Idle));
        assert_eq!(snap.status_of("done"), Some(Status::Py3Only));
        assert_eq!(
            snap.group_members("web").unwrap().iter().collect::<Vec<_>>(),
            vec!["app", "lib"]
        );
        assert!(snap.package("lib").unwrap().groups.contains("web"));
        assert!(matches!(snap.group("nope"), Err(PortdbError::GroupNotFound(_))));
        assert!(matches!(snap.package("nope"), Err(PortdbError::PackageNotFound(_))));
        assert!(snap.graph_hash.starts_with("blake3:"));
    }

    #[test]
    fn pending_lists_skip_finished_packages() {
        let snap = derive(&store(), &PortdbConfig::default()).unwrap();
        let pending: Vec<&str> = snap.pending_requirements("app").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(pending, vec!["lib"]);
        let requirers: Vec<&str> = snap.pending_requirers("lib").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(requirers, vec!["app"]);
        assert_eq!(snap.requirements_of("Zed").count(), 1);
        assert!(snap.pending_requirements("Zed").iter().all(|p| p.name == "done"));
    }

    #[test]
    fn weight_order_then_case_insensitive_name() {
        let snap = derive(&store(), &PortdbConfig::default()).unwrap();
        let order: Vec<&str> = snap.by_weight().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["lib", "Zed", "app", "done"]);
    }

    #[test]
    fn priority_weight_lifts_a_package_within_its_status() {
        let store = store_with(|facts| match facts.name.as_str() {
            "Zed" => facts.priority = Some(Priority::High),
            "app" => {
                facts.priority = Some(Priority::Medium);
                facts.deadline = NaiveDate::from_ymd_opt(2019, 6, 1);
            }
            _ => {}
        });
        let snap = derive(&store, &PortdbConfig::default()).unwrap();
        let order: Vec<&str> = snap.by_weight().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["Zed", "lib", "app", "done"]);
        assert_eq!(snap.package("lib").unwrap().priority, Priority::Unknown);
        assert_eq!(snap.package("app").unwrap().deadline, NaiveDate::from_ymd_opt(2019, 6, 1));
    }

    #[test]
    fn counts_follow_report_order() {
        let snap = derive(&store(), &PortdbConfig::default()).unwrap();
        let counts = snap.status_counts();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.done, 1);
        assert!((counts.percent_done - 25.0).abs() < f64::EPSILON);
        assert_eq!(counts.counts.len(), Status::EXPOSED.len());
        assert_eq!(counts.counts[0].0, Status::Dropped);
        assert_eq!(counts.counts.iter().map(|(_, n)| n).sum::<usize>(), 4);
    }

    #[test]
    fn json_export_round_trips_for_diff() {
        let snap = derive(&store(), &PortdbConfig::default()).unwrap();
        let json = snap.to_json().unwrap();
        let parsed: DerivedSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snap);
        assert!(snap.status_changes(&parsed).is_empty());
    }

    #[test]
    fn status_changes_report_moves_additions_and_removals() {
        let old = derive(&store(), &PortdbConfig::default()).unwrap();
        let mut new = old.clone();
        if let Some(lib) = new.packages.get_mut("lib") {
            lib.status = Status::Released;
        }
        new.packages.remove("Zed");
        let mut extra = new.packages["done"].clone();
        extra.name = "extra".to_string();
        new.packages.insert("extra".to_string(), extra);

        let changes = new.status_changes(&old);
        assert_eq!(
            changes,
            vec![
                StatusChange { name: "Zed".into(), old: Some(Status::Idle), new: None },
                StatusChange { name: "extra".into(), old: None, new: Some(Status::Py3Only) },
                StatusChange { name: "lib".into(), old: Some(Status::Idle), new: Some(Status::Released) },
            ]
        );
    }

    #[test]
    fn cell_swaps_snapshots() {
        let facts = store();
        let cell = SnapshotCell::new(derive(&facts, &PortdbConfig::default()).unwrap());
        let before = cell.load();

        let mut config = PortdbConfig::default();
        config.data.collection = "other".to_string();
        let after = cell.reload(&facts, &config).unwrap();

        assert_eq!(before.packages, after.packages, "old readers keep their snapshot");
        assert!(Arc::ptr_eq(&after, &cell.load()));
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn failed_reload_keeps_current_snapshot() {
        let facts = store();
        let cell = SnapshotCell::new(derive(&facts, &PortdbConfig::default()).unwrap());
        let before = cell.load();

        let mut config = PortdbConfig::default();
        config.classify.max_rounds = Some(0);
        assert!(cell.reload(&facts, &config).is_err());
        assert!(Arc::ptr_eq(&before, &cell.load()));
    }
}
