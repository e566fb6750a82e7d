//! Transitive dependency closure of package groups.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use portdb_core::facts::FactStore;
use portdb_core::model::{GroupDef, Status};

/// A group with its derived membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub ident: String,
    pub name: String,
    pub hidden: bool,
    /// Seeds that name known packages, sorted.
    pub seeds: BTreeSet<String>,
    /// Full closure, seeds included.
    pub packages: BTreeSet<String>,
}

/// Closure of `seeds` over run-time and build-time requirements.
///
/// Requirements of `dropped` packages are not followed; the dropped package
/// itself stays in the set. Seeds that name no known package are skipped.
#[must_use]
pub fn closure<'a>(
    store: &FactStore,
    status_of: impl Fn(&str) -> Option<Status>,
    seeds: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<String> {
    let mut members: BTreeSet<String> = BTreeSet::new();
    let mut worklist: Vec<String> = Vec::new();

    for seed in seeds {
        if store.contains(seed) && members.insert(seed.to_string()) {
            worklist.push(seed.to_string());
        }
    }

    while let Some(name) = worklist.pop() {
        if status_of(&name) == Some(Status::Dropped) {
            continue;
        }
        for requirement in store.requirements(&name) {
            if members.insert(requirement.to_string()) {
                worklist.push(requirement.to_string());
            }
        }
    }

    members
}

/// Derive the membership of every group in the store.
#[must_use]
#[instrument(skip_all)]
pub fn group_closures(
    store: &FactStore,
    status_of: impl Fn(&str) -> Option<Status> + Copy,
) -> BTreeMap<String, GroupMembership> {
    store
        .groups()
        .map(|group| {
            let membership = group_closure(store, status_of, group);
            (group.ident.clone(), membership)
        })
        .collect()
}

fn group_closure(
    store: &FactStore,
    status_of: impl Fn(&str) -> Option<Status>,
    group: &GroupDef,
) -> GroupMembership {
    let mut seeds = BTreeSet::new();
    for seed in &group.packages {
        if store.contains(seed) {
            seeds.insert(seed.clone());
        } else {
            warn!(group = %group.ident, package = %seed, "unknown group seed ignored");
        }
    }
    let packages = closure(store, status_of, seeds.iter().map(String::as_str));
    debug!(group = %group.ident, seeds = seeds.len(), members = packages.len(), "group closure");

    GroupMembership {
        ident: group.ident.clone(),
        name: group.name.clone(),
        hidden: group.hidden,
        seeds,
        packages,
    }
}

/// Invert group memberships: package → idents of the groups holding it.
#[must_use]
pub fn package_groups(groups: &BTreeMap<String, GroupMembership>) -> BTreeMap<String, BTreeSet<String>> {
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for group in groups.values() {
        for package in &group.packages {
            index
                .entry(package.clone())
                .or_default()
                .insert(group.ident.clone());
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use portdb_core::model::PackageFacts;

    fn store(requires: &[(&str, &[&str])], groups: &[(&str, &[&str])]) -> FactStore {
        let packages = requires
            .iter()
            .map(|(name, deps)| {
                let mut facts = PackageFacts::new(*name);
                facts.deps = deps.iter().map(|d| (*d).to_string()).collect();
                ((*name).to_string(), facts)
            })
            .collect();
        let groups = groups
            .iter()
            .map(|(ident, seeds)| {
                (
                    (*ident).to_string(),
                    GroupDef {
                        packages: seeds.iter().map(|s| (*s).to_string()).collect(),
                        ..GroupDef::default()
                    },
                )
            })
            .collect();
        FactStore::new("test", packages, groups, BTreeMap::new())
    }

    #[test]
    fn closure_follows_requirements_transitively() {
        let s = store(
            &[("app", &["lib"]), ("lib", &["base"]), ("base", &[]), ("other", &[])],
            &[],
        );
        let members = closure(&s, |_| Some(Status::Idle), ["app"]);
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["app", "base", "lib"]);
    }

    #[test]
    fn dropped_packages_are_not_expanded() {
        let s = store(&[("app", &["old"]), ("old", &["legacy"]), ("legacy", &[])], &[]);
        let members = closure(
            &s,
            |name| Some(if name == "old" { Status::Dropped } else { Status::Idle }),
            ["app"],
        );
        assert!(members.contains("old"));
        assert!(!members.contains("legacy"));
    }

    #[test]
    fn cycles_terminate() {
        let s = store(&[("a", &["b"]), ("b", &["a"])], &[]);
        let members = closure(&s, |_| None, ["a"]);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn groups_get_membership_and_back_references() {
        let s = store(
            &[("app", &["lib"]), ("lib", &[]), ("tool", &["lib"])],
            &[("web", &["app", "ghost"]), ("cli", &["tool"])],
        );
        let groups = group_closures(&s, |_| Some(Status::Idle));
        let web = &groups["web"];
        assert_eq!(web.seeds.len(), 1, "unknown seed skipped");
        assert_eq!(web.name, "web");
        assert!(web.packages.contains("lib"));

        let index = package_groups(&groups);
        assert_eq!(
            index["lib"].iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["cli", "web"]
        );
        assert_eq!(index["app"].len(), 1);
    }
}
