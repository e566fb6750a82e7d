//! Raw per-package facts as supplied by the harvesting collaborators.
//!
//! Everything in this module is input data. The engine never mutates it;
//! derived fields (status, group membership, naming buckets) live in the
//! engine's snapshot instead.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::priority::Priority;
use super::status::Status;

/// Python major version tag attached to a declared dependency.
pub type PythonVersion = u8;

/// Architecture string used for source artifacts.
pub const SOURCE_ARCH: &str = "src";

/// Which Python major versions an artifact needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PyNeeds {
    None,
    Py2,
    Py3,
    Both,
}

impl PyNeeds {
    #[must_use]
    pub const fn needs_py2(self) -> bool {
        matches!(self, Self::Py2 | Self::Both)
    }

    #[must_use]
    pub const fn needs_py3(self) -> bool {
        matches!(self, Self::Py3 | Self::Both)
    }
}

/// Requirement lists of one built artifact, by dependency kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementLists {
    pub requires: Vec<String>,
    #[serde(alias = "requires(pre)")]
    pub requires_pre: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
    pub supplements: Vec<String>,
    pub enhances: Vec<String>,
}

impl RequirementLists {
    /// Requirements that must be present at run time (`requires` + pre-install).
    pub fn run_time(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .chain(&self.requires_pre)
            .map(String::as_str)
    }

    /// Every requirement, weak dependencies included.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.run_time().chain(
            self.recommends
                .iter()
                .chain(&self.suggests)
                .chain(&self.supplements)
                .chain(&self.enhances)
                .map(String::as_str),
        )
    }
}

/// Name part of an RPM requirement, without its version constraint.
///
/// `python2-lib >= 1.0` names `python2-lib`. Blank requirements name nothing.
#[must_use]
pub fn requirement_name(requirement: &str) -> Option<&str> {
    requirement.split_whitespace().next()
}

/// One built artifact (binary or source RPM) of a package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpmFacts {
    pub arch: String,
    /// Declared Python dependencies, e.g. `"python(abi) = 3.9" -> 3`.
    pub py_deps: BTreeMap<String, PythonVersion>,
    pub is_misnamed: bool,
    /// Installed file paths; only executables matter to the engine.
    pub files: Vec<String>,
    /// Capability names this artifact provides besides its own name.
    pub provides: Vec<String>,
    #[serde(flatten)]
    pub requirements: RequirementLists,
}

impl RpmFacts {
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.arch == SOURCE_ARCH
    }

    #[must_use]
    pub fn python_versions(&self) -> BTreeSet<PythonVersion> {
        self.py_deps.values().copied().collect()
    }

    #[must_use]
    pub fn needs(&self) -> PyNeeds {
        let versions = self.python_versions();
        match (versions.contains(&2), versions.contains(&3)) {
            (true, true) => PyNeeds::Both,
            (true, false) => PyNeeds::Py2,
            (false, true) => PyNeeds::Py3,
            (false, false) => PyNeeds::None,
        }
    }
}

/// Kind of an external link attached to a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Homepage,
    Bug,
    Repo,
}

/// A URL associated with a package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// Raw facts for one source package (srpm group).
///
/// `status`, `note`, `nonblocking`, `priority` and `deadline` are curated fields: they are empty in
/// harvested data and filled by update/override files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageFacts {
    pub name: String,
    pub rpms: BTreeMap<String, RpmFacts>,
    /// Run-time requirements by srpm name.
    pub deps: BTreeSet<String>,
    /// Build-time requirements by srpm name.
    pub build_deps: BTreeSet<String>,
    /// Build-time requirements by artifact or capability name.
    pub build_requires: Vec<String>,
    pub is_misnamed: bool,
    pub nonblocking: bool,
    pub status: Option<Status>,
    pub note: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<NaiveDate>,
    pub links: Vec<Link>,
    pub tracking_bugs: BTreeSet<String>,
}

impl PackageFacts {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A package is misnamed if flagged itself or if any artifact is.
    #[must_use]
    pub fn is_misnamed(&self) -> bool {
        self.is_misnamed || self.rpms.values().any(|rpm| rpm.is_misnamed)
    }

    /// The most recent `last_update` among the package's links.
    #[must_use]
    pub fn last_link_update(&self) -> Option<DateTime<Utc>> {
        self.links.iter().filter_map(|link| link.last_update).max()
    }

    /// Attach bug records as `bug` links and record the trackers they block.
    ///
    /// A record whose URL is already linked only fills in that link's
    /// missing timestamp.
    pub fn attach_bugs(&mut self, bugs: &[BugRecord]) {
        for bug in bugs {
            self.tracking_bugs.extend(bug.trackers.iter().cloned());
            if let Some(link) = self.links.iter_mut().find(|link| link.url == bug.url) {
                link.last_update = link.last_update.or(bug.last_change);
                continue;
            }
            self.links.push(bug.to_link());
        }
    }
}

/// A curated package group definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDef {
    pub ident: String,
    pub name: String,
    pub hidden: bool,
    /// Seed package names; full membership is derived by the closure engine.
    pub packages: Vec<String>,
}

/// A bug-tracker record attached to a package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BugRecord {
    pub url: String,
    pub status: String,
    pub resolution: Option<String>,
    pub last_change: Option<DateTime<Utc>>,
    /// Tracker bugs this record blocks (URLs or IDs).
    pub trackers: BTreeSet<String>,
}

impl BugRecord {
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status.eq_ignore_ascii_case("closed")
            && self.resolution.as_deref().is_none_or(str::is_empty)
    }

    /// The record as a `bug` link noted with its status and resolution.
    #[must_use]
    pub fn to_link(&self) -> Link {
        let note = self
            .resolution
            .as_deref()
            .filter(|r| !r.is_empty())
            .map_or_else(|| self.status.clone(), |resolution| format!("{} {resolution}", self.status));
        Link {
            url: self.url.clone(),
            kind: LinkKind::Bug,
            note: (!note.is_empty()).then_some(note),
            last_update: self.last_change,
        }
    }
}
