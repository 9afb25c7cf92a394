//! Merge job: concatenate caller-ordered files into one archive file.

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::clean::unit_file_name;
use super::{JobContext, JobReport};
use crate::errors::JobError;
use crate::file_utils::FileManager;
use crate::project::{MERGED_PREFIX, ProjectLayout, UNIT_EXTENSION};

/// Written before the content of every merged file
pub const CHAPTER_SEPARATOR: &str = "\n\n---CHAPTER START---\n\n";

/// Summary of a merge run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub output: PathBuf,
    pub merged: usize,
    /// Files that could not be read and were left out
    pub failed: Vec<String>,
}

/// Fresh output path `archive/merged_translation_<YYYYMMDD_HHMMSS>[_n].txt`
fn output_path(archive_dir: &Path) -> PathBuf {
    let stem = format!("{}translation_{}", MERGED_PREFIX, Local::now().format("%Y%m%d_%H%M%S"));
    let mut candidate = archive_dir.join(format!("{}{}", stem, UNIT_EXTENSION));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = archive_dir.join(format!("{}_{}{}", stem, suffix, UNIT_EXTENSION));
        suffix += 1;
    }
    candidate
}

/// Merge `files` in the given order
pub async fn run(mut ctx: JobContext, layout: ProjectLayout, files: Vec<PathBuf>) -> Result<JobReport> {
    if files.is_empty() {
        return Err(JobError::NoInput("no files selected for merging".to_string()).into());
    }

    let archive_dir = layout.archive_dir();
    FileManager::ensure_dir(&archive_dir)?;
    let output = output_path(&archive_dir);
    let file = File::create(&output).with_context(|| format!("Failed to create merge output {:?}", output))?;
    let mut writer = BufWriter::new(file);

    let mut report = MergeReport {
        output: output.clone(),
        ..MergeReport::default()
    };
    let total = files.len();
    info!("Merging {} files into {:?}", total, output);

    for (index, path) in files.iter().enumerate() {
        if !ctx.checkpoint().await {
            break;
        }
        let name = unit_file_name(path);

        match FileManager::read_to_string(path) {
            Ok(content) => {
                writer.write_all(CHAPTER_SEPARATOR.as_bytes())?;
                writer.write_all(content.as_bytes())?;
                writer.flush().with_context(|| format!("Failed to write merge output {:?}", output))?;
                debug!("Merged {}", name);
                report.merged += 1;
            }
            Err(e) => {
                warn!("Skipping {} in merge: {:#}", name, e);
                ctx.unit_failed(&name, format!("{:#}", e));
                report.failed.push(name);
            }
        }
        ctx.progress(index + 1, total);
    }

    writer.flush()?;
    info!("Merged {} files, {} skipped", report.merged, report.failed.len());
    Ok(JobReport::Merge(report))
}
