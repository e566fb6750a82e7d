use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for scripts and reporting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DataFileMissing,
    DataFileParse,
    DataFileUnreadable,
    InvalidFacts,
    ConfigParseError,
    PackageNotFound,
    GroupNotFound,
    FixpointDiverged,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DataFileMissing => "E1001",
            Self::DataFileParse => "E1002",
            Self::DataFileUnreadable => "E1003",
            Self::InvalidFacts => "E1004",
            Self::ConfigParseError => "E1005",
            Self::PackageNotFound => "E2001",
            Self::GroupNotFound => "E2002",
            Self::FixpointDiverged => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DataFileMissing => "Required data file not found",
            Self::DataFileParse => "Data file parse error",
            Self::DataFileUnreadable => "Data file could not be read",
            Self::InvalidFacts => "Data file does not match the fact schema",
            Self::ConfigParseError => "Config file parse error",
            Self::PackageNotFound => "Package not found",
            Self::GroupNotFound => "Group not found",
            Self::FixpointDiverged => "Fixpoint did not converge",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::DataFileMissing => {
                Some("Pass the directory holding the file with --datadir or set PORTDB_DATA.")
            }
            Self::DataFileParse | Self::InvalidFacts => {
                Some("Fix the reported file; nothing was loaded.")
            }
            Self::DataFileUnreadable => Some("Check file permissions and retry."),
            Self::ConfigParseError => Some("Fix syntax in portdb.toml and retry."),
            Self::PackageNotFound | Self::GroupNotFound => None,
            Self::FixpointDiverged => Some("Report a bug with the data set that triggers it."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by loading and deriving porting data.
#[derive(Debug, thiserror::Error)]
pub enum PortdbError {
    /// A required lookup file is absent from every data directory.
    #[error("required data file '{basename}' not found in {}", format_dirs(.searched))]
    MissingDataFile {
        basename: String,
        searched: Vec<PathBuf>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid data in {}: {source}", .path.display())]
    InvalidFacts {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("package '{0}' not found")]
    PackageNotFound(String),

    #[error("group '{0}' not found")]
    GroupNotFound(String),

    /// An iterative derivation stage hit its round cap without settling.
    #[error("internal error: {stage} did not converge after {rounds} rounds")]
    FixpointDiverged { stage: &'static str, rounds: usize },

}

impl PortdbError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingDataFile { .. } => ErrorCode::DataFileMissing,
            Self::Io { .. } => ErrorCode::DataFileUnreadable,
            Self::Parse { .. } => ErrorCode::DataFileParse,
            Self::InvalidFacts { .. } => ErrorCode::InvalidFacts,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::PackageNotFound(_) => ErrorCode::PackageNotFound,
            Self::GroupNotFound(_) => ErrorCode::GroupNotFound,
            Self::FixpointDiverged { .. } => ErrorCode::FixpointDiverged,
        }
    }

    /// Remediation hint for this error, if one exists.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        self.error_code().hint()
    }
}

fn format_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "(no data directories)".to_string();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
