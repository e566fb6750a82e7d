pub mod package;
pub mod priority;
pub mod status;

use serde::{Deserialize, Serialize};

pub use package::{
    BugRecord, GroupDef, Link, LinkKind, PackageFacts, PyNeeds, PythonVersion, RequirementLists,
    RpmFacts, requirement_name,
};
pub use priority::Priority;
pub use status::{ParseStatusError, Status};

/// A directed `requirer -> requirement` edge between two packages.
///
/// One row per ordered pair; the flags say which kinds of requirement exist.
/// Self-loops are never stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub requirer: String,
    pub requirement: String,
    pub run_time: bool,
    pub build_time: bool,
    /// The requirer names this requirement without a Python version.
    #[serde(default)]
    pub unversioned: bool,
}
