/*!
 * Fixed on-disk layout of a project.
 *
 * ```text
 * <project>/raw/                      downloaded units
 * <project>/translated/               translated_<unit>
 * <project>/archive/                  merged_<timestamp>.txt and sidecars
 * <project>/archive/chapter_check/    chapter-check reports
 * ```
 */

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

pub const RAW_DIR: &str = "raw";
pub const TRANSLATED_DIR: &str = "translated";
pub const ARCHIVE_DIR: &str = "archive";
pub const CHAPTER_CHECK_DIR: &str = "chapter_check";

pub const UNIT_EXTENSION: &str = ".txt";
pub const TRANSLATED_PREFIX: &str = "translated_";
pub const MERGED_PREFIX: &str = "merged_";

pub const TRANSLATION_LEDGER: &str = "translation_errors.json";
pub const CLEANING_LEDGER: &str = "cleaning_errors.json";
pub const CHAPTER_CHECK_LEDGER: &str = "chapter_check_errors.json";
pub const TOKEN_CACHE: &str = "token_data.json";

/// Paths of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Create every stage directory
    pub fn init(&self) -> Result<()> {
        FileManager::ensure_dir(self.raw_dir())?;
        FileManager::ensure_dir(self.translated_dir())?;
        FileManager::ensure_dir(self.archive_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn translated_dir(&self) -> PathBuf {
        self.root.join(TRANSLATED_DIR)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    pub fn chapter_check_dir(&self) -> PathBuf {
        self.archive_dir().join(CHAPTER_CHECK_DIR)
    }

    pub fn translation_ledger_path(&self) -> PathBuf {
        self.archive_dir().join(TRANSLATION_LEDGER)
    }

    pub fn cleaning_ledger_path(&self) -> PathBuf {
        self.archive_dir().join(CLEANING_LEDGER)
    }

    pub fn chapter_check_ledger_path(&self) -> PathBuf {
        self.archive_dir().join(CHAPTER_CHECK_LEDGER)
    }

    pub fn token_cache_path(&self) -> PathBuf {
        self.archive_dir().join(TOKEN_CACHE)
    }

    pub fn raw_path(&self, unit_name: &str) -> PathBuf {
        self.raw_dir().join(unit_name)
    }

    /// Translated file for a raw unit name
    pub fn translated_path(&self, unit_name: &str) -> PathBuf {
        self.translated_dir().join(translated_name(unit_name))
    }
}

/// `page_1.txt` -> `translated_page_1.txt`
pub fn translated_name(unit_name: &str) -> String {
    format!("{}{}", TRANSLATED_PREFIX, unit_name)
}

/// `page_1.txt` -> `page_1`
pub fn base_key(unit_name: &str) -> &str {
    unit_name.strip_suffix(UNIT_EXTENSION).unwrap_or(unit_name)
}

/// `translated_page_1.txt` -> `page_1.txt`
pub fn original_name_of(translated_name: &str) -> &str {
    translated_name.strip_prefix(TRANSLATED_PREFIX).unwrap_or(translated_name)
}
