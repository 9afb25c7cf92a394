/*!
 * Chapter-check job.
 *
 * Looks for the chapter word in the first lines of every selected file.
 * Files without it get the placeholder heading prepended. Two line-oriented
 * reports are kept under `archive/chapter_check/`:
 *
 * ```text
 * present.txt   <name>\n<heading line>\n--------------------\n   per file
 * missing.txt   <name>\n                                       per file
 * ```
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use super::clean::unit_file_name;
use super::{JobContext, JobReport};
use crate::app_config::TextRules;
use crate::errors::JobError;
use crate::file_utils::FileManager;
use crate::ledger::ErrorLedger;
use crate::project::ProjectLayout;
use crate::transform::{find_heading_line, prepend_heading};

pub const PRESENT_REPORT: &str = "present.txt";
pub const MISSING_REPORT: &str = "missing.txt";
const REPORT_SEPARATOR: &str = "--------------------";

/// Summary of a chapter-check run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterCheckReport {
    /// `(file name, heading line)` of files that already had a heading
    pub present: Vec<(String, String)>,
    /// Files that received the placeholder heading
    pub missing: Vec<String>,
    pub failed: usize,
}

impl ChapterCheckReport {
    fn present_text(&self) -> String {
        self.present
            .iter()
            .map(|(name, line)| format!("{}\n{}\n{}\n", name, line, REPORT_SEPARATOR))
            .collect()
    }

    fn missing_text(&self) -> String {
        self.missing.iter().map(|name| format!("{}\n", name)).collect()
    }

    /// Rewrite both report files
    fn write_to(&self, dir: &Path) -> Result<()> {
        FileManager::write_atomic(dir.join(PRESENT_REPORT), &self.present_text())
            .context("Failed to write chapter-check present report")?;
        FileManager::write_atomic(dir.join(MISSING_REPORT), &self.missing_text())
            .context("Failed to write chapter-check missing report")?;
        Ok(())
    }
}

enum Outcome {
    Present(String),
    Missing,
}

fn check_file(path: &Path, rules: &TextRules) -> Result<Outcome> {
    let text = FileManager::read_to_string(path)?;
    match find_heading_line(&text, &rules.chapter_word) {
        Some(line) => Ok(Outcome::Present(line)),
        None => {
            FileManager::write_atomic(path, &prepend_heading(&text, &rules.placeholder_heading))?;
            Ok(Outcome::Missing)
        }
    }
}

/// Check `files` in the given order. The reports are rewritten after every
/// file, so a cancelled run leaves partial reports covering the files done so far.
pub async fn run(mut ctx: JobContext, layout: ProjectLayout, files: Vec<PathBuf>, rules: TextRules) -> Result<JobReport> {
    if files.is_empty() {
        return Err(JobError::NoInput("no files selected for chapter check".to_string()).into());
    }

    let report_dir = layout.chapter_check_dir();
    FileManager::ensure_dir(&report_dir)?;
    let mut ledger = ErrorLedger::load(layout.chapter_check_ledger_path());
    let mut report = ChapterCheckReport::default();
    let total = files.len();
    info!("Checking chapter headings of {} files", total);

    for (index, path) in files.iter().enumerate() {
        if !ctx.checkpoint().await {
            break;
        }
        let name = unit_file_name(path);

        match check_file(path, &rules) {
            Ok(Outcome::Present(line)) => {
                debug!("{}: heading {:?}", name, line);
                ledger.clear(&name);
                report.present.push((name, line));
            }
            Ok(Outcome::Missing) => {
                debug!("{}: placeholder heading added", name);
                ledger.clear(&name);
                report.missing.push(name);
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!("{}: {}", name, message);
                ledger.record(&name, message.clone());
                ctx.unit_failed(&name, message);
                report.failed += 1;
            }
        }

        report.write_to(&report_dir)?;
        ledger.save()?;
        ctx.progress(index + 1, total);
    }

    info!(
        "Chapter check done: {} with heading, {} without, {} failed",
        report.present.len(),
        report.missing.len(),
        report.failed
    );
    Ok(JobReport::ChapterCheck(report))
}
