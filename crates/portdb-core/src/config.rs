use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PortdbError;

/// File name looked up in the first data directory.
pub const PROJECT_CONFIG_FILE: &str = "portdb.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortdbConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub bugs: BugConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Basename of the raw facts file (`<collection>.json` / `.yaml`).
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
        }
    }
}

/// Who may require a Python 2 artifact before it stops being a leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafPolicy {
    /// Only artifacts of the same srpm may require it.
    #[default]
    AlmostLeaf,
    /// Nothing at all may require it.
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Python ABIs that mark a package as built for an outdated interpreter.
    #[serde(default)]
    pub outdated_abis: Vec<String>,
    /// Directory prefixes whose files count as executables.
    #[serde(default = "default_binary_dirs")]
    pub binary_dirs: Vec<String>,
    #[serde(default)]
    pub leaf_policy: LeafPolicy,
    /// Hard cap on fixpoint rounds; `None` derives one from the package count.
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            outdated_abis: Vec::new(),
            binary_dirs: default_binary_dirs(),
            leaf_policy: LeafPolicy::default(),
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Requirement suffixes naming documentation subpackages.
    #[serde(default = "default_doc_suffixes")]
    pub doc_suffixes: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            doc_suffixes: default_doc_suffixes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugConfig {
    /// Tracker bug whose open blockers are reported as mispackaged.
    #[serde(default)]
    pub mispackaged_tracker: Option<String>,
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config_file(path: &Path) -> Result<PortdbConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| PortdbError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = toml::from_str::<PortdbConfig>(&content).map_err(|err| PortdbError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(config)
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("portdb/config.toml"))
}

/// Resolve the effective configuration.
///
/// Precedence: an explicit `--config` path (must exist), then
/// `portdb.toml` in the first data directory, then the user config, then
/// built-in defaults.
///
/// # Errors
///
/// Returns an error if a chosen config file cannot be read or parsed.
pub fn resolve_config(explicit: Option<&Path>, data_dirs: &[PathBuf]) -> Result<PortdbConfig> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }

    if let Some(first) = data_dirs.first() {
        let path = first.join(PROJECT_CONFIG_FILE);
        if path.exists() {
            return load_config_file(&path);
        }
    }

    match user_config_path() {
        Some(path) if path.exists() => load_config_file(&path),
        _ => Ok(PortdbConfig::default()),
    }
}

fn default_collection() -> String {
    "fedora".to_string()
}

fn default_binary_dirs() -> Vec<String> {
    vec!["/usr/bin/".to_string(), "/usr/sbin/".to_string()]
}

fn default_doc_suffixes() -> Vec<String> {
    vec!["-doc".to_string(), "-docs".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: PortdbConfig = toml::from_str("").unwrap();
        assert_eq!(config, PortdbConfig::default());
        assert_eq!(config.data.collection, "fedora");
        assert_eq!(config.classify.binary_dirs, vec!["/usr/bin/", "/usr/sbin/"]);
        assert_eq!(config.classify.leaf_policy, LeafPolicy::AlmostLeaf);
        assert!(config.bugs.mispackaged_tracker.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: PortdbConfig = toml::from_str(
            r#"
            [data]
            collection = "rawhide"

            [classify]
            outdated_abis = ["python(abi) = 3.4"]
            leaf_policy = "leaf"
            max_rounds = 50

            [bugs]
            mispackaged_tracker = "https://bugs.example/1285816"
            "#,
        )
        .unwrap();
        assert_eq!(config.data.collection, "rawhide");
        assert_eq!(config.classify.outdated_abis, vec!["python(abi) = 3.4"]);
        assert_eq!(config.classify.leaf_policy, LeafPolicy::Leaf);
        assert_eq!(config.classify.max_rounds, Some(50));
        assert_eq!(config.classify.binary_dirs.len(), 2);
        assert_eq!(config.naming.doc_suffixes, vec!["-doc", "-docs"]);
        assert_eq!(
            config.bugs.mispackaged_tracker.as_deref(),
            Some("https://bugs.example/1285816")
        );
    }

    #[test]
    fn project_file_in_first_data_dir_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(
            first.path().join(PROJECT_CONFIG_FILE),
            "[data]\ncollection = \"first\"\n",
        )
        .unwrap();
        std::fs::write(
            second.path().join(PROJECT_CONFIG_FILE),
            "[data]\ncollection = \"second\"\n",
        )
        .unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let config = resolve_config(None, &dirs).unwrap();
        assert_eq!(config.data.collection, "first");
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(resolve_config(Some(&missing), &[]).is_err());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "[classify\nmax_rounds = ").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
        let portdb = err.downcast_ref::<PortdbError>().expect("typed config error");
        assert_eq!(portdb.error_code().code(), "E1005");
    }
}
