use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

static NATURAL_CHUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+|[^0-9]+").expect("valid chunk regex"));

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// List file names directly inside `dir` that start with `prefix` and end with `extension`.
    ///
    /// A directory that does not exist yields an empty list. The result is in
    /// natural order.
    pub fn list_stage_files<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let suffix = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };

        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(prefix) && name.ends_with(&suffix) {
                names.push(name);
            }
        }

        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Replace a file through a sibling temp file and a rename, so readers
    /// never observe a half-written file.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in: {:?}", parent))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temp file for: {:?}", path))?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace file: {:?}", path))?;
        Ok(())
    }

    /// Modification time in float seconds since the epoch
    pub fn modified_secs<P: AsRef<Path>>(path: P) -> Result<f64> {
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to stat file: {:?}", path.as_ref()))?;
        let modified = metadata.modified()?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok(since_epoch.as_secs_f64())
    }

    /// Creation time and size, each unknown when the stat fails
    pub fn stamp<P: AsRef<Path>>(path: P) -> FileStamp {
        match fs::metadata(&path) {
            Ok(metadata) => {
                let created = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .ok()
                    .map(DateTime::<Local>::from);
                FileStamp { created, size: Some(metadata.len()) }
            }
            Err(e) => {
                log::warn!("Failed to stat {:?}: {}", path.as_ref(), e);
                FileStamp::default()
            }
        }
    }
}

/// Creation time and size of a stage file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileStamp {
    /// `None` when the stat failed
    pub created: Option<DateTime<Local>>,
    /// `None` when the stat failed
    pub size: Option<u64>,
}

impl FileStamp {
    pub fn created_display(&self) -> String {
        self.created
            .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn size_display(&self) -> String {
        self.size.map(format_file_size).unwrap_or_else(|| "unknown".to_string())
    }
}

/// Human-readable byte size
pub fn format_file_size(size_bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes = size_bytes as f64;
    if bytes < KB {
        format!("{} B", size_bytes)
    } else if bytes < KB * KB {
        format!("{:.2} KB", bytes / KB)
    } else if bytes < KB * KB * KB {
        format!("{:.2} MB", bytes / (KB * KB))
    } else {
        format!("{:.2} GB", bytes / (KB * KB * KB))
    }
}

/// Natural ("human") ordering: digit runs compare numerically, text runs
/// compare case-insensitively. Equal keys fall back to plain string order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = NATURAL_CHUNK.find_iter(a).map(|m| m.as_str());
    let mut right = NATURAL_CHUNK.find_iter(b).map(|m| m.as_str());

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunks(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.as_bytes()[0].is_ascii_digit();
    let y_digits = y.as_bytes()[0].is_ascii_digit();

    match (x_digits, y_digits) {
        (true, true) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.to_lowercase().cmp(&y.to_lowercase()),
    }
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
