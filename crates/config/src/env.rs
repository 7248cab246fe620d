//! Environment namespace and dotenv file merging
//!
//! The binder never reads the process environment itself. Callers snapshot
//! it into an [`EnvStore`], optionally merge a dotenv file on top, and hand
//! the store to [`ConfigBinder`](crate::ConfigBinder).

use crate::error::EnvFileError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Case-sensitive variable name to raw value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvStore {
    vars: BTreeMap<String, String>,
}

impl EnvStore {
    /// Empty store; binding against it yields only defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Entries whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Set `key` unless it already has a value. Returns whether it was set.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        use std::collections::btree_map::Entry;

        match self.vars.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Merge a dotenv file, keeping every variable that is already present.
    ///
    /// The whole file is parsed before anything is merged, so a malformed
    /// line leaves the store untouched. Returns how many keys were added.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, EnvFileError> {
        let path = path.as_ref();
        let entries = parse_env_file(path)?;

        let total = entries.len();
        let mut added = 0;
        for (key, value) in entries {
            if self.insert_if_absent(key, value) {
                added += 1;
            }
        }

        debug!(
            path = %path.display(),
            entries = total,
            added,
            "Merged env file"
        );
        Ok(added)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Parse a dotenv file into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comment lines are skipped. Every other line is split
/// on its first `=`; key and value are trimmed and one pair of matching
/// quotes around the value is removed. Values are otherwise taken
/// literally: no variable expansion, escapes or inline comments. A line
/// without `=` or with an empty key is reported with its line number.
pub fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>, EnvFileError> {
    let content = fs::read_to_string(path).map_err(|source| EnvFileError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        match parse_line(line) {
            Line::Skip => continue,
            Line::Entry(key, value) => entries.push((key.to_string(), value.to_string())),
            Line::Malformed => {
                return Err(EnvFileError::Parse {
                    path: path.to_path_buf(),
                    line: index + 1,
                })
            }
        }
    }

    Ok(entries)
}

enum Line<'a> {
    Skip,
    Entry(&'a str, &'a str),
    Malformed,
}

fn parse_line(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Skip;
    }

    match trimmed.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Line::Entry(key.trim(), strip_quotes(value.trim()))
        }
        _ => Line::Malformed,
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
