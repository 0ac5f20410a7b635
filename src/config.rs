//! Option sets: grouped, string-keyed configuration lookups.
//!
//! Connection names are resolved against an [`OptionSet`]. A missing key is
//! reported as [`DbError::ConfigKeyMissing`], which callers may treat as a
//! recoverable signal rather than a failure.

use crate::core::{DbError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A keyed lookup of configuration values organised in named groups.
pub trait OptionSet {
    /// Returns the value stored under `key` in `group`.
    fn get(&self, group: &str, key: &str) -> Result<String>;
}

/// An option set held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryOptionSet {
    groups: HashMap<String, HashMap<String, String>>,
}

impl MemoryOptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` in `group`, replacing any previous value.
    pub fn set(&mut self, group: &str, key: &str, value: impl Into<String>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Builder-style variant of [`MemoryOptionSet::set`].
    pub fn with(mut self, group: &str, key: &str, value: impl Into<String>) -> Self {
        self.set(group, key, value);
        self
    }
}

impl OptionSet for MemoryOptionSet {
    fn get(&self, group: &str, key: &str) -> Result<String> {
        self.groups
            .get(group)
            .and_then(|options| options.get(key))
            .cloned()
            .ok_or_else(|| DbError::key_missing(group, key))
    }
}

/// An option set loaded from a TOML document.
///
/// Every top-level table is a group. Nested tables are flattened into dotted
/// keys, so these two documents are equivalent:
///
/// ```toml
/// [databases]
/// "main.driver" = "Sqlite"
/// "main.write" = "name=/var/lib/app/main.db"
/// ```
///
/// ```toml
/// [databases.main]
/// driver = "Sqlite"
/// write = "name=/var/lib/app/main.db"
/// ```
#[derive(Debug, Default, Clone)]
pub struct TomlOptionSet {
    options: MemoryOptionSet,
}

impl TomlOptionSet {
    /// Loads an option set from the TOML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading option set");
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses an option set from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let document: toml::value::Table =
            toml::from_str(content).map_err(|e| DbError::Config(e.to_string()))?;

        let mut options = MemoryOptionSet::new();
        for (group, value) in document {
            match value {
                toml::Value::Table(table) => flatten(&mut options, &group, None, table),
                _ => {
                    return Err(DbError::Config(format!(
                        "top-level entry '{}' must be a table",
                        group
                    )))
                }
            }
        }
        Ok(TomlOptionSet { options })
    }
}

impl OptionSet for TomlOptionSet {
    fn get(&self, group: &str, key: &str) -> Result<String> {
        self.options.get(group, key)
    }
}

fn flatten(
    options: &mut MemoryOptionSet,
    group: &str,
    prefix: Option<&str>,
    table: toml::value::Table,
) {
    for (key, value) in table {
        let full_key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            toml::Value::Table(nested) => flatten(options, group, Some(&full_key), nested),
            toml::Value::String(s) => options.set(group, &full_key, s),
            // arrays and datetimes are kept in their TOML rendering
            other => options.set(group, &full_key, other.to_string()),
        }
    }
}
