pub mod completions;
pub mod cycles;
pub mod deps;
pub mod diff;
pub mod group;
pub mod load;
pub mod naming;
pub mod report;
pub mod show;
pub mod status;
pub mod tiers;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use portdb_core::config::{PortdbConfig, resolve_config};
use portdb_core::load::load_from_directories;
use portdb_engine::{DerivedSnapshot, derive};

/// Where the data lives, from the global flags.
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    pub data_dirs: Vec<PathBuf>,
    pub config: Option<PathBuf>,
}

impl DataSource {
    pub fn new(data_dirs: Vec<PathBuf>, config: Option<PathBuf>) -> Self {
        let data_dirs = if data_dirs.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            data_dirs
        };
        Self { data_dirs, config }
    }

    /// Load the facts and derive a snapshot.
    pub fn derive(&self) -> anyhow::Result<(PortdbConfig, DerivedSnapshot)> {
        let config = resolve_config(self.config.as_deref(), &self.data_dirs)
            .context("failed to resolve configuration")?;
        debug!(collection = %config.data.collection, dirs = ?self.data_dirs, "loading");

        let store = load_from_directories(&self.data_dirs, &config)?;
        let snapshot = derive(&store, &config)?;
        Ok((config, snapshot))
    }
}

/// Read a snapshot written by `portdb load --output`.
pub fn read_export(path: &Path) -> anyhow::Result<DerivedSnapshot> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a portdb export", path.display()))
}
