/*!
 * Stage reconciliation.
 *
 * Builds one ordered list of [`ContentUnit`]s from the three stage
 * directories, the translation and cleaning ledgers and the token cache.
 * Units are rebuilt from disk on every call; nothing here is mutated in place.
 *
 * Keys:
 * - `raw/page_1.txt` and `translated/translated_page_1.txt` share the key `page_1`
 * - `archive/merged_x.txt` gets the key `archive/merged_x`, which no chapter
 *   file can produce because stage listings never contain a `/`
 */

use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::file_utils::{FileManager, FileStamp, natural_cmp};
use crate::ledger::ErrorLedger;
use crate::project::{MERGED_PREFIX, ProjectLayout, TRANSLATED_PREFIX, UNIT_EXTENSION, base_key, original_name_of};
use crate::token_cache::{MetricCache, StageTag, TokenCount};

/// Key prefix of archive-level units
pub const ARCHIVE_KEY_PREFIX: &str = "archive/";

/// Derived status of a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// A merge output in the archive
    Archived,
    /// Translated file whose raw source is gone, with the last error if any
    MissingOriginal { error: Option<String> },
    TranslationFailed(String),
    CleaningFailed(String),
    Translated,
    Downloaded,
}

impl UnitStatus {
    /// Higher wins when several statuses apply to one unit
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Archived => 5,
            Self::MissingOriginal { .. } => 4,
            Self::TranslationFailed(_) => 3,
            Self::CleaningFailed(_) => 2,
            Self::Translated => 1,
            Self::Downloaded => 0,
        }
    }

    pub fn outranks(&self, other: &UnitStatus) -> bool {
        self.precedence() > other.precedence()
    }

    pub fn is_error(&self) -> bool {
        match self {
            Self::TranslationFailed(_) | Self::CleaningFailed(_) => true,
            Self::MissingOriginal { error } => error.is_some(),
            _ => false,
        }
    }

    /// Text shown in status listings
    pub fn label(&self) -> String {
        match self {
            Self::Archived => "merged".to_string(),
            Self::MissingOriginal { error: None } => "missing original".to_string(),
            Self::MissingOriginal { error: Some(error) } => format!("missing original, error: {}", error),
            Self::TranslationFailed(error) => format!("translation error: {}", error),
            Self::CleaningFailed(error) => format!("cleaning error: {}", error),
            Self::Translated => "translated".to_string(),
            Self::Downloaded => "downloaded".to_string(),
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One chapter (or one merge output) across all stages
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    pub key: String,
    pub original_name: Option<String>,
    pub original_path: Option<PathBuf>,
    pub translated_name: Option<String>,
    pub translated_path: Option<PathBuf>,
    pub merged_name: Option<String>,
    pub merged_path: Option<PathBuf>,
    /// Stamp of the earliest stage file the unit has
    pub stamp: FileStamp,
    pub status: UnitStatus,
    /// `None` when the unit has no file of that stage
    pub original_tokens: Option<TokenCount>,
    /// Count of the translated file, or of the merge output for archive units
    pub translated_tokens: Option<TokenCount>,
}

impl ContentUnit {
    pub fn is_archive(&self) -> bool {
        self.merged_name.is_some()
    }

    /// Raw file name, `missing` when a translation has no source, `-` for archive units
    pub fn original_display(&self) -> &str {
        match (&self.original_name, self.is_archive()) {
            (Some(name), _) => name,
            (None, true) => "-",
            (None, false) => "missing",
        }
    }

    /// Translated file name, or the merge output name for archive units
    pub fn output_display(&self) -> &str {
        self.translated_name
            .as_deref()
            .or(self.merged_name.as_deref())
            .unwrap_or("-")
    }
}

/// Partial record collected over the three passes
#[derive(Debug, Default)]
struct Record {
    original: Option<(String, PathBuf)>,
    translated: Option<(String, PathBuf)>,
    merged: Option<(String, PathBuf)>,
    translation_error: Option<String>,
    cleaning_error: Option<String>,
}

impl Record {
    fn status(&self) -> UnitStatus {
        let mut applicable = vec![UnitStatus::Downloaded];
        if self.merged.is_some() {
            applicable.push(UnitStatus::Archived);
        }
        if self.original.is_none() && self.translated.is_some() {
            applicable.push(UnitStatus::MissingOriginal {
                error: self.translation_error.clone().or_else(|| self.cleaning_error.clone()),
            });
        }
        if let Some(error) = &self.translation_error {
            applicable.push(UnitStatus::TranslationFailed(error.clone()));
        }
        if let Some(error) = &self.cleaning_error {
            applicable.push(UnitStatus::CleaningFailed(error.clone()));
        }
        if self.translated.is_some() {
            applicable.push(UnitStatus::Translated);
        }

        applicable
            .into_iter()
            .max_by_key(UnitStatus::precedence)
            .unwrap_or(UnitStatus::Downloaded)
    }

    fn stamp_path(&self) -> Option<&Path> {
        self.original
            .as_ref()
            .or(self.translated.as_ref())
            .or(self.merged.as_ref())
            .map(|(_, path)| path.as_path())
    }
}

fn list_or_empty(dir: &Path, prefix: &str) -> Vec<String> {
    FileManager::list_stage_files(dir, prefix, UNIT_EXTENSION).unwrap_or_else(|e| {
        warn!("Treating {:?} as empty: {:#}", dir, e);
        Vec::new()
    })
}

/// Load the ledgers and the token cache of `layout` and reconcile
pub fn reconcile(layout: &ProjectLayout) -> Vec<ContentUnit> {
    let translation_ledger = ErrorLedger::load(layout.translation_ledger_path());
    let cleaning_ledger = ErrorLedger::load(layout.cleaning_ledger_path());
    let cache = MetricCache::load(layout.token_cache_path());
    reconcile_with(layout, &translation_ledger, &cleaning_ledger, &cache)
}

/// Reconcile the stage directories against already loaded sidecars
pub fn reconcile_with(
    layout: &ProjectLayout,
    translation_ledger: &ErrorLedger,
    cleaning_ledger: &ErrorLedger,
    cache: &MetricCache,
) -> Vec<ContentUnit> {
    let mut records: HashMap<String, Record> = HashMap::new();

    let raw_dir = layout.raw_dir();
    for name in list_or_empty(&raw_dir, "") {
        let record = records.entry(base_key(&name).to_string()).or_default();
        record.translation_error = translation_ledger.get(&name).map(str::to_string);
        record.cleaning_error = cleaning_ledger.get(&name).map(str::to_string);
        record.original = Some((name.clone(), raw_dir.join(&name)));
    }

    let translated_dir = layout.translated_dir();
    for name in list_or_empty(&translated_dir, TRANSLATED_PREFIX) {
        let original_candidate = original_name_of(&name);
        let record = records.entry(base_key(original_candidate).to_string()).or_default();
        if let Some(error) = translation_ledger.get(original_candidate) {
            record.translation_error = Some(error.to_string());
        }
        if let Some(error) = cleaning_ledger.get(&name) {
            record.cleaning_error = Some(error.to_string());
        }
        record.translated = Some((name.clone(), translated_dir.join(&name)));
    }

    let archive_dir = layout.archive_dir();
    for name in list_or_empty(&archive_dir, MERGED_PREFIX) {
        let key = format!("{}{}", ARCHIVE_KEY_PREFIX, base_key(&name));
        let record = records.entry(key).or_default();
        record.merged = Some((name.clone(), archive_dir.join(&name)));
    }

    let mut units: Vec<ContentUnit> = records
        .into_iter()
        .map(|(key, record)| build_unit(key, record, cache))
        .collect();
    units.sort_by(|a, b| natural_cmp(&a.key, &b.key));
    debug!("Reconciled {} units", units.len());
    units
}

fn build_unit(key: String, record: Record, cache: &MetricCache) -> ContentUnit {
    let status = record.status();
    let stamp = record.stamp_path().map(FileManager::stamp).unwrap_or_default();

    let original_tokens = record
        .original
        .as_ref()
        .map(|(name, _)| cache.count_for(name, StageTag::Original));
    let translated_tokens = match (&record.translated, &record.merged) {
        (Some((name, _)), _) => Some(cache.count_for(name, StageTag::Translated)),
        (None, Some((name, _))) => Some(cache.count_for(name, StageTag::Merged)),
        (None, None) => None,
    };

    let (original_name, original_path) = record.original.unzip();
    let (translated_name, translated_path) = record.translated.unzip();
    let (merged_name, merged_path) = record.merged.unzip();

    ContentUnit {
        key,
        original_name,
        original_path,
        translated_name,
        translated_path,
        merged_name,
        merged_path,
        stamp,
        status,
        original_tokens,
        translated_tokens,
    }
}
