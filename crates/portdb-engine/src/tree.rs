//! Dependency trees for the `deps` report.
//!
//! A depth-first walk over requirements starting at one or more roots. A
//! package is expanded the first time it is reached; later visits are
//! listed but not expanded again.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use portdb_core::error::PortdbError;
use portdb_core::model::Status;

use crate::snapshot::DerivedSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Packages listed but never expanded.
    pub exclude: BTreeSet<String>,
    /// Do not expand released or dropped packages.
    pub trim: bool,
    /// Leave trimmed and excluded packages out entirely.
    pub skip: bool,
}

/// Why a tree line was or was not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeMark {
    Expanded,
    /// Already expanded above.
    Seen,
    /// Released or dropped, trimmed.
    Finished,
    Excluded,
}

impl TreeMark {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Expanded => "",
            Self::Seen => " *",
            Self::Finished => " ✔",
            Self::Excluded => " (excluded)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeLine {
    pub depth: usize,
    pub name: String,
    pub status: Status,
    pub mark: TreeMark,
}

const fn is_finished(status: Status) -> bool {
    matches!(status, Status::Released | Status::Dropped)
}

/// Walk requirements from `roots` in preorder.
///
/// # Errors
///
/// Returns [`PortdbError::PackageNotFound`] if a root is unknown.
pub fn dependency_tree(
    snapshot: &DerivedSnapshot,
    roots: &[String],
    options: &TreeOptions,
) -> Result<Vec<TreeLine>, PortdbError> {
    for root in roots {
        snapshot.package(root)?;
    }

    let mut lines = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<(usize, &str)> = roots.iter().rev().map(|r| (0, r.as_str())).collect();

    while let Some((depth, name)) = stack.pop() {
        let Some(status) = snapshot.status_of(name) else {
            continue;
        };

        let mark = if options.exclude.contains(name) {
            TreeMark::Excluded
        } else if seen.contains(name) {
            TreeMark::Seen
        } else if options.trim && is_finished(status) {
            TreeMark::Finished
        } else {
            TreeMark::Expanded
        };

        if mark == TreeMark::Expanded {
            seen.insert(name);
            let children: BTreeSet<&str> = snapshot
                .requirements_of(name)
                .map(|dep| dep.requirement.as_str())
                .filter(|child| {
                    !options.skip
                        || !(options.exclude.contains(*child)
                            || (options.trim && snapshot.status_of(child).is_some_and(is_finished)))
                })
                .collect();
            stack.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
        }

        lines.push(TreeLine {
            depth,
            name: name.to_string(),
            status,
            mark,
        });
    }

    Ok(lines)
}
