/*!
 * Per-stage error ledger.
 *
 * A ledger maps a unit file name to the message of its last failed attempt.
 * It is stored as a flat JSON object next to the archive and is the single
 * source of truth for "did the last attempt on this unit fail".
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// Persisted map of unit name to last error
#[derive(Debug, Clone, Default)]
pub struct ErrorLedger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ErrorLedger {
    /// Load the ledger at `path`. A missing or unreadable file yields an empty ledger.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt ledger {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read ledger {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, unit: &str) -> Option<&str> {
        self.entries.get(unit).map(String::as_str)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.entries.contains_key(unit)
    }

    /// Remember the last failure of `unit`
    pub fn record(&mut self, unit: &str, message: impl Into<String>) {
        let message = message.into();
        debug!("Ledger {:?}: {} -> {}", self.path.file_name().unwrap_or_default(), unit, message);
        self.entries.insert(unit.to_string(), message);
    }

    /// Forget `unit` after a successful attempt. Returns whether an entry existed.
    pub fn clear(&mut self, unit: &str) -> bool {
        self.entries.remove(unit).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the sidecar file atomically
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries).context("Failed to serialize ledger")?;
        FileManager::write_atomic(&self.path, &json)
            .with_context(|| format!("Failed to save ledger {:?}", self.path))
    }
}
