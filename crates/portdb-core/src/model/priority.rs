use serde::{Deserialize, Serialize};
use std::fmt;

/// Curated porting priority of a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Blocker,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Blocker => "blocker",
        }
    }

    #[must_use]
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Unknown => "?",
            Self::Low => "L",
            Self::Medium => "M",
            Self::High => "H",
            Self::Blocker => "B",
        }
    }

    /// Added to the status weight when ordering package lists.
    #[must_use]
    pub const fn weight(self) -> i32 {
        match self {
            Self::Unknown | Self::Low => 0,
            Self::Medium => 5,
            Self::High => 10,
            Self::Blocker => 25,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
