use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Porting status of a package.
///
/// `Unknown` is the initial value before classification and never appears
/// in a derived snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Unknown,
    Idle,
    Blocked,
    InProgress,
    Mispackaged,
    Released,
    LegacyLeaf,
    Py3Only,
    Dropped,
}

impl Status {
    /// Every status a classified package can end up in, in report order.
    pub const EXPOSED: [Self; 8] = [
        Self::Dropped,
        Self::Py3Only,
        Self::LegacyLeaf,
        Self::Released,
        Self::InProgress,
        Self::Mispackaged,
        Self::Idle,
        Self::Blocked,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Blocked => "blocked",
            Self::InProgress => "in-progress",
            Self::Mispackaged => "mispackaged",
            Self::Released => "released",
            Self::LegacyLeaf => "legacy-leaf",
            Self::Py3Only => "py3-only",
            Self::Dropped => "dropped",
        }
    }

    /// Display name for reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Idle => "Idle",
            Self::Blocked => "Blocked",
            Self::InProgress => "In progress",
            Self::Mispackaged => "Mispackaged",
            Self::Released => "Released",
            Self::LegacyLeaf => "Legacy leaf",
            Self::Py3Only => "Python 3 only",
            Self::Dropped => "Dropped",
        }
    }

    /// Two-letter abbreviation used in terminal columns.
    #[must_use]
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Unknown => "??",
            Self::Idle => "ID",
            Self::Blocked => "BL",
            Self::InProgress => "IP",
            Self::Mispackaged => "MP",
            Self::Released => "RE",
            Self::LegacyLeaf => "LL",
            Self::Py3Only => "P3",
            Self::Dropped => "DR",
        }
    }

    /// Report color (RRGGBB).
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Unknown => "FFFFFF",
            Self::Idle => "C9C9C9",
            Self::Blocked => "E2A6A6",
            Self::InProgress => "5BC0DE",
            Self::Mispackaged => "F0AD4E",
            Self::Released => "4CAE4C",
            Self::LegacyLeaf => "9BD59B",
            Self::Py3Only => "2E7D32",
            Self::Dropped => "337AB7",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Unknown => "Not yet classified.",
            Self::Idle => "Needs porting and nothing is stopping it.",
            Self::Blocked => "Needs porting, but depends on packages that are not ported yet.",
            Self::InProgress => "Someone is working on the port.",
            Self::Mispackaged => "Ported, but the packaging needs fixing.",
            Self::Released => "Ported; Python 3 artifacts are shipped.",
            Self::LegacyLeaf => "Ported; the remaining Python 2 artifacts are not used by anything else.",
            Self::Py3Only => "Ships no Python 2 artifacts at all.",
            Self::Dropped => "Being removed from the distribution.",
        }
    }

    /// What a packager should do with a package in this status.
    #[must_use]
    pub const fn instructions(self) -> &'static str {
        match self {
            Self::Unknown => "Wait for the next load.",
            Self::Idle => "Port the package to Python 3.",
            Self::Blocked => "Help port its dependencies first.",
            Self::InProgress => "Coordinate with the person doing the port.",
            Self::Mispackaged => "Fix the packaging as described in the note.",
            Self::Released => "Consider dropping the Python 2 subpackages.",
            Self::LegacyLeaf => "Drop the Python 2 subpackages when possible.",
            Self::Py3Only | Self::Dropped => "Nothing.",
        }
    }

    /// Sort weight for package lists; heavier statuses are listed first.
    #[must_use]
    pub const fn weight(self) -> i32 {
        match self {
            Self::Mispackaged => 60,
            Self::InProgress => 50,
            Self::Idle => 40,
            Self::Blocked => 30,
            Self::Released => 20,
            Self::LegacyLeaf => 15,
            Self::Py3Only => 10,
            Self::Unknown | Self::Dropped => 0,
        }
    }

    /// Rank used when summarizing several statuses of one package.
    /// Higher rank trumps a lower one.
    #[must_use]
    pub const fn rank(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Idle => 10,
            Self::Blocked => 20,
            Self::Released => 30,
            Self::LegacyLeaf => 35,
            Self::Py3Only => 40,
            Self::InProgress => 50,
            Self::Mispackaged => 60,
            Self::Dropped => 70,
        }
    }

    /// Index in report order (progress bars, status tables).
    #[must_use]
    pub fn order(self) -> usize {
        Self::EXPOSED
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::EXPOSED.len())
    }

    /// Terminal statuses stop blocking propagation and count as finished.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(
            self,
            Self::Released | Self::LegacyLeaf | Self::Py3Only | Self::Dropped
        )
    }

    /// Pick the highest-ranked status; `Unknown` for an empty input.
    pub fn summarize(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses
            .into_iter()
            .max_by_key(|s| s.rank())
            .unwrap_or(Self::Unknown)
    }
}

/// Error returned when parsing a status from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub got: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: '{}'", self.got)
    }
}

impl std::error::Error for ParseStatusError {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "unknown" => Ok(Self::Unknown),
            "idle" => Ok(Self::Idle),
            "blocked" => Ok(Self::Blocked),
            "in-progress" => Ok(Self::InProgress),
            "mispackaged" => Ok(Self::Mispackaged),
            "released" => Ok(Self::Released),
            "legacy-leaf" => Ok(Self::LegacyLeaf),
            "py3-only" => Ok(Self::Py3Only),
            "dropped" => Ok(Self::Dropped),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}
