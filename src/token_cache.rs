/*!
 * Token-count cache keyed by file name and fingerprinted by modification time.
 *
 * The cache avoids re-counting files whose content has not changed since the
 * last sweep. An entry is trusted only while the file's current modification
 * time equals the one recorded next to the count.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// Which stage a file belongs to; selects the field pair of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageTag {
    Original,
    Translated,
    Merged,
}

/// Token count as shown for a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCount {
    Counted(u64),
    /// No cache entry exists for the file yet
    NotComputed,
    /// The last count attempt failed
    Unavailable,
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counted(count) => write!(f, "{}", count),
            Self::NotComputed => write!(f, "not computed"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Cached counts of one file name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTokenData {
    #[serde(default)]
    pub original_tokens: Option<u64>,
    #[serde(default)]
    pub original_mtime: Option<f64>,
    #[serde(default)]
    pub translated_tokens: Option<u64>,
    #[serde(default)]
    pub translated_mtime: Option<f64>,
    #[serde(default)]
    pub merged_tokens: Option<u64>,
    #[serde(default)]
    pub merged_mtime: Option<f64>,
}

impl FileTokenData {
    fn slot(&self, stage: StageTag) -> (Option<u64>, Option<f64>) {
        match stage {
            StageTag::Original => (self.original_tokens, self.original_mtime),
            StageTag::Translated => (self.translated_tokens, self.translated_mtime),
            StageTag::Merged => (self.merged_tokens, self.merged_mtime),
        }
    }

    fn set_slot(&mut self, stage: StageTag, tokens: Option<u64>, mtime: Option<f64>) {
        match stage {
            StageTag::Original => {
                self.original_tokens = tokens;
                self.original_mtime = mtime;
            }
            StageTag::Translated => {
                self.translated_tokens = tokens;
                self.translated_mtime = mtime;
            }
            StageTag::Merged => {
                self.merged_tokens = tokens;
                self.merged_mtime = mtime;
            }
        }
    }
}

/// On-disk shape of the cache sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStore {
    #[serde(default)]
    pub file_token_data: BTreeMap<String, FileTokenData>,
    #[serde(default)]
    pub total_original_tokens: u64,
    #[serde(default)]
    pub total_translated_tokens: u64,
    #[serde(default)]
    pub total_combined_tokens: u64,
}

/// Aggregate token sums; merged files are never part of them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTotals {
    pub original: u64,
    pub translated: u64,
    pub combined: u64,
}

/// Project-scoped token cache
#[derive(Debug, Clone, Default)]
pub struct MetricCache {
    path: PathBuf,
    store: TokenStore,
}

impl MetricCache {
    /// Load the cache at `path`. A missing or corrupt file yields an empty cache.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let store = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt token cache {:?}: {}", path, e);
                TokenStore::default()
            }),
            Err(_) => TokenStore::default(),
        };
        Self { path, store }
    }

    pub fn entry(&self, file_name: &str) -> Option<&FileTokenData> {
        self.store.file_token_data.get(file_name)
    }

    /// Count to display for a file, without touching the disk
    pub fn count_for(&self, file_name: &str, stage: StageTag) -> TokenCount {
        match self.entry(file_name) {
            None => TokenCount::NotComputed,
            Some(entry) => match entry.slot(stage).0 {
                Some(count) => TokenCount::Counted(count),
                None => TokenCount::Unavailable,
            },
        }
    }

    /// Cached count, only if it was recorded for exactly `mtime`
    pub fn lookup(&self, file_name: &str, stage: StageTag, mtime: f64) -> Option<u64> {
        let (tokens, recorded) = self.entry(file_name)?.slot(stage);
        match recorded {
            Some(recorded) if recorded == mtime => tokens,
            _ => None,
        }
    }

    /// Store a count; `None` marks the file unavailable and untrusted
    pub fn put(&mut self, file_name: &str, stage: StageTag, tokens: Option<u64>, mtime: Option<f64>) {
        let entry = self.store.file_token_data.entry(file_name.to_string()).or_default();
        match tokens {
            Some(_) => entry.set_slot(stage, tokens, mtime),
            None => entry.set_slot(stage, None, None),
        }
    }

    /// Return the cached count when the file is unchanged, otherwise run
    /// `compute` and remember its result. A failed computation yields `None`.
    pub async fn get_or_compute<F, Fut>(
        &mut self,
        file_name: &str,
        path: &Path,
        stage: StageTag,
        compute: F,
    ) -> CacheLookup
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        let mtime = match FileManager::modified_secs(path) {
            Ok(mtime) => mtime,
            Err(e) => {
                warn!("Cannot fingerprint {}: {}", file_name, e);
                self.put(file_name, stage, None, None);
                return CacheLookup::Failed;
            }
        };

        if let Some(count) = self.lookup(file_name, stage, mtime) {
            debug!("Token cache hit for {} ({} tokens)", file_name, count);
            return CacheLookup::Cached(count);
        }

        match compute(path.to_path_buf()).await {
            Ok(count) => {
                debug!("Counted {} tokens for {}", count, file_name);
                self.put(file_name, stage, Some(count), Some(mtime));
                CacheLookup::Computed(count)
            }
            Err(e) => {
                warn!("Token count failed for {}: {:#}", file_name, e);
                self.put(file_name, stage, None, None);
                CacheLookup::Failed
            }
        }
    }

    /// Drop entries whose file no longer exists in any stage
    pub fn retain_files(&mut self, present: &HashSet<String>) {
        self.store.file_token_data.retain(|name, _| present.contains(name));
    }

    /// Sum original and translated counts over every entry
    pub fn totals(&self) -> TokenTotals {
        let mut totals = TokenTotals::default();
        for entry in self.store.file_token_data.values() {
            totals.original += entry.original_tokens.unwrap_or(0);
            totals.translated += entry.translated_tokens.unwrap_or(0);
        }
        totals.combined = totals.original + totals.translated;
        totals
    }

    /// Refresh the stored totals and rewrite the sidecar atomically
    pub fn save(&mut self) -> Result<()> {
        let totals = self.totals();
        self.store.total_original_tokens = totals.original;
        self.store.total_translated_tokens = totals.translated;
        self.store.total_combined_tokens = totals.combined;

        let json = serde_json::to_string_pretty(&self.store).context("Failed to serialize token cache")?;
        FileManager::write_atomic(&self.path, &json)
            .with_context(|| format!("Failed to save token cache {:?}", self.path))
    }
}

/// Outcome of [`MetricCache::get_or_compute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Cached(u64),
    Computed(u64),
    Failed,
}

impl CacheLookup {
    pub fn count(self) -> Option<u64> {
        match self {
            Self::Cached(count) | Self::Computed(count) => Some(count),
            Self::Failed => None,
        }
    }
}
