//! Symbol store - the persisted name dictionary
//!
//! A flat JSON object keyed by qualified symbol name. A string value is the
//! display name chosen for that symbol, `null` marks a symbol that was seen
//! but could not be resolved:
//!
//! ```json
//! {
//!   "a.b.C": "Connection",
//!   "a.b.C.a(int).b(param)": "timeout",
//!   "java.io.PrintStream.a(?)": null
//! }
//! ```

use crate::naming::is_valid_identifier;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// How a symbol was classified when it was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolState {
    /// Binding found; carries the display name to persist
    Valid(String),
    /// No binding; persisted as the unresolved sentinel
    Missing,
}

impl SymbolState {
    fn into_value(self) -> Option<String> {
        match self {
            SymbolState::Valid(name) => Some(name),
            SymbolState::Missing => None,
        }
    }
}

/// Process-wide symbol dictionary.
///
/// Entries loaded from disk are never removed: saving writes the union of
/// the loaded entries and everything recorded during this run, with the
/// current run winning on conflicting keys.
#[derive(Debug, Default, Clone)]
pub struct SymbolStore {
    /// Entries as loaded from disk
    entries: BTreeMap<String, Option<String>>,
    /// Entries recorded during this run
    recorded: BTreeMap<String, Option<String>>,
}

impl SymbolStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from disk; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No symbol store at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let store = Self::from_json(path, &contents)?;
        tracing::info!("Loaded {} symbols from {}", store.entries.len(), path.display());
        Ok(store)
    }

    /// Parse the persisted form; `origin` is only used for diagnostics
    pub fn from_json(origin: &Path, contents: &str) -> Result<Self> {
        let entries: BTreeMap<String, Option<String>> =
            serde_json::from_str(contents).map_err(|e| Error::StoreFormat {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        for (key, value) in &entries {
            if let Some(name) = value {
                if !is_valid_identifier(name) {
                    tracing::warn!("Ignoring display name {:?} for {}: not a Java identifier", name, key);
                }
            }
        }

        Ok(Self {
            entries,
            recorded: BTreeMap::new(),
        })
    }

    /// Display name for a qualified name, if one was chosen
    pub fn lookup(&self, qualified_name: &str) -> Option<&str> {
        self.recorded
            .get(qualified_name)
            .or_else(|| self.entries.get(qualified_name))
            .and_then(|value| value.as_deref())
            .filter(|name| is_valid_identifier(name))
    }

    /// Whether the key is known at all (resolved or sentinel)
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.recorded.contains_key(qualified_name) || self.entries.contains_key(qualified_name)
    }

    /// Record a classified symbol for the next save
    pub fn record(&mut self, qualified_name: impl Into<String>, state: SymbolState) {
        self.recorded.insert(qualified_name.into(), state.into_value());
    }

    /// Every display name the store may hand out
    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .chain(self.recorded.values())
            .filter_map(|value| value.as_deref())
    }

    /// Number of entries loaded from disk
    pub fn loaded_len(&self) -> usize {
        self.entries.len()
    }

    /// Union of loaded and recorded entries, recorded values winning
    pub fn merged(&self) -> BTreeMap<String, Option<String>> {
        let mut merged = self.entries.clone();
        for (key, value) in &self.recorded {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Total number of keys a save would write
    pub fn len(&self) -> usize {
        self.entries.len()
            + self
                .recorded
                .keys()
                .filter(|key| !self.entries.contains_key(*key))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the merged store, replacing the file only once fully written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let mut contents = serde_json::to_string_pretty(&self.merged()).map_err(|e| {
            Error::StoreFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        contents.push('\n');

        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = std::path::PathBuf::from(temp);

        std::fs::write(&temp, contents).map_err(|e| Error::io(&temp, e))?;
        std::fs::rename(&temp, path).map_err(|e| Error::io(path, e))?;
        tracing::info!("Saved {} symbols to {}", self.len(), path.display());
        Ok(())
    }
}
