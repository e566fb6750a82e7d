//! Loading raw facts from data directories.
//!
//! Every data file is looked up by basename across the configured data
//! directories in order; the first `<basename>.yaml`, `.yml` or `.json`
//! found wins. Files are decoded into a generic JSON value first so that
//! update files can be deep-merged before the typed decode.
//!
//! | basename               | required | contents                          |
//! |------------------------|----------|-----------------------------------|
//! | `<collection>`         | yes      | package name -> raw facts         |
//! | `<collection>-update`  | no       | deep-merged over the facts        |
//! | `groups`               | yes      | group ident -> definition         |
//! | `overrides`            | no       | package name -> status/note/...   |
//! | `bugs`                 | no       | package name -> bug records       |
//!
//! Loading is all-or-nothing: the first missing required file or decode
//! failure aborts with a [`PortdbError`] and no store is built.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::PortdbConfig;
use crate::error::PortdbError;
use crate::facts::FactStore;
use crate::model::{BugRecord, GroupDef, PackageFacts, Priority, Status};

/// Extensions tried for every basename, in order.
pub const DATA_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

pub const GROUPS_BASENAME: &str = "groups";
pub const OVERRIDES_BASENAME: &str = "overrides";
pub const BUGS_BASENAME: &str = "bugs";

/// A curated correction for one package.
///
/// Fields left out keep the harvested value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Override {
    pub status: Option<Status>,
    pub note: Option<String>,
    pub nonblocking: Option<bool>,
    pub priority: Option<Priority>,
    pub deadline: Option<NaiveDate>,
}

/// Find `<basename>.{yaml,yml,json}` in the first directory that has one.
#[must_use]
pub fn find_data_file(dirs: &[PathBuf], basename: &str) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            DATA_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{basename}.{ext}")))
        })
        .find(|path| path.is_file())
}

/// Decode a YAML or JSON file into a generic value.
///
/// # Errors
///
/// Returns [`PortdbError::Io`] if the file cannot be read and
/// [`PortdbError::Parse`] if it is not valid for its extension.
pub fn decode_file(path: &Path) -> Result<Value, PortdbError> {
    let content = fs::read_to_string(path).map_err(|source| PortdbError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json {
        serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str::<Value>(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| PortdbError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Recursively merge `updates` into `base`.
///
/// Objects present on both sides merge key by key; any other value in
/// `updates` replaces the one in `base`.
pub fn merge_updates(base: &mut Value, updates: Value) {
    match (base, updates) {
        (Value::Object(base), Value::Object(updates)) => {
            for (key, new_value) in updates {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && new_value.is_object() => {
                        merge_updates(existing, new_value);
                    }
                    _ => {
                        base.insert(key, new_value);
                    }
                }
            }
        }
        (base, updates) => *base = updates,
    }
}

/// Load every data file and build the fact store.
///
/// # Errors
///
/// Returns [`PortdbError::MissingDataFile`] when the facts or groups file
/// is absent, and the decode errors of [`decode_file`] or
/// [`PortdbError::InvalidFacts`] when a file does not match its schema.
#[instrument(skip(config), fields(collection = %config.data.collection))]
pub fn load_from_directories(
    dirs: &[PathBuf],
    config: &PortdbConfig,
) -> Result<FactStore, PortdbError> {
    let collection = config.data.collection.as_str();

    let (facts_path, mut facts) = required(dirs, collection)?;
    let update_name = format!("{collection}-update");
    if let Some((path, updates)) = optional(dirs, &update_name)? {
        debug!(path = %path.display(), "merging update file");
        merge_updates(&mut facts, updates);
    }
    let mut packages: BTreeMap<String, PackageFacts> = typed(&facts_path, null_entries_as_empty(facts))?;

    let (groups_path, groups) = required(dirs, GROUPS_BASENAME)?;
    let groups: BTreeMap<String, GroupDef> = typed(&groups_path, null_entries_as_empty(groups))?;

    if let Some((path, overrides)) = optional(dirs, OVERRIDES_BASENAME)? {
        let overrides: BTreeMap<String, Override> = typed(&path, overrides)?;
        apply_overrides(&mut packages, overrides);
    }

    let bugs: BTreeMap<String, Vec<BugRecord>> = match optional(dirs, BUGS_BASENAME)? {
        Some((path, bugs)) => typed(&path, bugs)?,
        None => BTreeMap::new(),
    };

    info!(
        packages = packages.len(),
        groups = groups.len(),
        bugs = bugs.len(),
        "loaded facts"
    );
    Ok(FactStore::new(collection, packages, groups, bugs))
}

/// Merge curated overrides into the packages' curated fields.
///
/// Overrides naming unknown packages are skipped with a warning.
pub fn apply_overrides(packages: &mut BTreeMap<String, PackageFacts>, overrides: BTreeMap<String, Override>) {
    for (name, entry) in overrides {
        let Some(package) = packages.get_mut(&name) else {
            warn!(package = %name, "override for unknown package ignored");
            continue;
        };
        if let Some(status) = entry.status {
            package.status = Some(status);
        }
        if entry.note.is_some() {
            package.note = entry.note;
        }
        if let Some(nonblocking) = entry.nonblocking {
            package.nonblocking = nonblocking;
        }
        if entry.priority.is_some() {
            package.priority = entry.priority;
        }
        if entry.deadline.is_some() {
            package.deadline = entry.deadline;
        }
    }
}

fn required(dirs: &[PathBuf], basename: &str) -> Result<(PathBuf, Value), PortdbError> {
    optional(dirs, basename)?.ok_or_else(|| PortdbError::MissingDataFile {
        basename: basename.to_string(),
        searched: dirs.to_vec(),
    })
}

fn optional(dirs: &[PathBuf], basename: &str) -> Result<Option<(PathBuf, Value)>, PortdbError> {
    let Some(path) = find_data_file(dirs, basename) else {
        debug!(basename, "no data file");
        return Ok(None);
    };
    let value = decode_file(&path)?;
    Ok(Some((path, value)))
}

fn typed<T: DeserializeOwned>(path: &Path, value: Value) -> Result<T, PortdbError> {
    // An empty YAML document decodes to null.
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|source| PortdbError::InvalidFacts {
        path: path.to_path_buf(),
        source,
    })
}

/// `name:` with no body in YAML means an entry with all defaults.
fn null_entries_as_empty(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        for entry in map.values_mut() {
            if entry.is_null() {
                *entry = Value::Object(serde_json::Map::new());
            }
        }
    }
    value
}
