//! Clean job: cut the front matter preceding the first chapter marker.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::PathBuf;

use super::{JobContext, JobReport};
use crate::app_config::TextRules;
use crate::errors::JobError;
use crate::file_utils::FileManager;
use crate::ledger::ErrorLedger;
use crate::project::ProjectLayout;
use crate::transform::ChapterMarker;

/// Ledger message of a file without any chapter marker
pub const MARKER_NOT_FOUND: &str = "Chapter marker not found; file left unchanged";

/// Summary of a clean run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// `(file name, marker)` of every truncated file
    pub cleaned: Vec<(String, String)>,
    /// Files left untouched because no marker was found
    pub unmarked: Vec<String>,
    pub failed: usize,
}

/// Clean `files` in the given order, recording outcomes in the cleaning ledger
pub async fn run(mut ctx: JobContext, layout: ProjectLayout, files: Vec<PathBuf>, rules: TextRules) -> Result<JobReport> {
    if files.is_empty() {
        return Err(JobError::NoInput("no files selected for cleaning".to_string()).into());
    }
    let marker = ChapterMarker::new(&rules.chapter_word).map_err(|e| JobError::Configuration(format!("{:#}", e)))?;

    let mut ledger = ErrorLedger::load(layout.cleaning_ledger_path());
    let mut report = CleanReport::default();
    let total = files.len();
    info!("Cleaning {} files", total);

    for (index, path) in files.iter().enumerate() {
        if !ctx.checkpoint().await {
            break;
        }
        let name = unit_file_name(path);

        let outcome = FileManager::read_to_string(path).and_then(|text| match marker.strip_front_matter(&text) {
            Some((cleaned, found)) => {
                if cleaned.len() != text.len() {
                    FileManager::write_atomic(path, &cleaned)?;
                }
                Ok(Some(found))
            }
            None => Ok(None),
        });

        match outcome {
            Ok(Some(found)) => {
                debug!("{}: cleaned at {:?}", name, found);
                ledger.clear(&name);
                report.cleaned.push((name, found));
            }
            Ok(None) => {
                debug!("{}: no chapter marker", name);
                ledger.record(&name, MARKER_NOT_FOUND);
                report.unmarked.push(name);
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!("{}: {}", name, message);
                ledger.record(&name, message.clone());
                ctx.unit_failed(&name, message);
                report.failed += 1;
            }
        }

        ledger.save()?;
        ctx.progress(index + 1, total);
    }

    info!(
        "Clean run done: {} cleaned, {} without marker, {} failed",
        report.cleaned.len(),
        report.unmarked.len(),
        report.failed
    );
    Ok(JobReport::Clean(report))
}

/// File name used as ledger key
pub(crate) fn unit_file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
