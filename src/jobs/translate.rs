/*!
 * Translation job: sends every raw unit to the translator with bounded
 * exponential backoff.
 *
 * Per unit the flow is `Pending -> Calling -> {Success, Retrying, Failed}`:
 * - units whose translated file exists and which have no ledger entry are skipped
 * - transient failures are retried until `max_attempts` calls were made,
 *   sleeping `backoff_unit * 2^attempt` in pause-aware slices
 * - any other failure, or the last transient one, is recorded in the
 *   translation ledger and a placeholder file keeps the slot filled
 */

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;

use super::{JobContext, JobReport};
use crate::app_config::{RetryPolicy, TranslationConfig};
use crate::errors::{JobError, ProviderError};
use crate::file_utils::{FileManager, truncate_chars};
use crate::ledger::ErrorLedger;
use crate::project::{ProjectLayout, UNIT_EXTENSION};
use crate::providers::Translator;

/// Characters of the source kept in a placeholder file
pub const PLACEHOLDER_EXCERPT_CHARS: usize = 500;

/// Settings of one translation run
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    // @field: Prompt text placed before each chapter
    pub prompt_prefix: String,
    // @field: Stop after this many newly translated units
    pub file_limit: Option<usize>,
    // @field: Attempts and backoff
    pub retry: RetryPolicy,
    // @field: Echoed in the report for the caller's post-run action
    pub shutdown_requested: bool,
}

impl TranslationOptions {
    pub fn from_config(config: &TranslationConfig, shutdown_requested: bool) -> Self {
        Self {
            prompt_prefix: config.prompt_prefix.clone(),
            file_limit: config.file_limit,
            retry: config.retry_policy(),
            shutdown_requested,
        }
    }
}

/// Summary of a translation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationReport {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Every call made to the translator, retries included
    pub api_calls: usize,
    pub limit_reached: bool,
    pub shutdown_requested: bool,
}

/// Result of the call loop for one unit
#[derive(Debug)]
enum CallOutcome {
    Success(String),
    Failed(ProviderError),
    Cancelled,
}

/// `prompt_prefix`, a blank line, then the chapter
pub fn build_prompt(prefix: &str, text: &str) -> String {
    format!("{}\n\n{}", prefix, text)
}

/// Content written in place of a translation that failed for good
pub fn placeholder_text(message: &str, original: &str) -> String {
    format!(
        "{}\n\nOriginal text:\n{}...",
        message,
        truncate_chars(original, PLACEHOLDER_EXCERPT_CHARS)
    )
}

/// Translate every raw unit of the project in natural order
pub async fn run(
    mut ctx: JobContext,
    layout: ProjectLayout,
    translator: Arc<dyn Translator>,
    options: TranslationOptions,
) -> Result<JobReport> {
    let raw_dir = layout.raw_dir();
    if !FileManager::dir_exists(&raw_dir) {
        return Err(JobError::DirectoryUnreadable {
            path: raw_dir.display().to_string(),
            message: "directory does not exist".to_string(),
        }
        .into());
    }
    let units = FileManager::list_stage_files(&raw_dir, "", UNIT_EXTENSION).map_err(|e| JobError::DirectoryUnreadable {
        path: raw_dir.display().to_string(),
        message: format!("{:#}", e),
    })?;
    FileManager::ensure_dir(layout.translated_dir())?;

    let mut ledger = ErrorLedger::load(layout.translation_ledger_path());
    let mut report = TranslationReport {
        shutdown_requested: options.shutdown_requested,
        ..TranslationReport::default()
    };
    let total = units.len();
    info!("Translating {} units from {:?}", total, raw_dir);

    for (index, name) in units.iter().enumerate() {
        if !ctx.checkpoint().await {
            break;
        }
        if options.file_limit.is_some_and(|limit| report.translated >= limit) {
            info!("File limit of {} reached", report.translated);
            report.limit_reached = true;
            break;
        }

        let target = layout.translated_path(name);
        if FileManager::file_exists(&target) && !ledger.contains(name) {
            debug!("Skipping {}: already translated", name);
            report.skipped += 1;
            ctx.progress(index + 1, total);
            continue;
        }

        let text = match FileManager::read_to_string(layout.raw_path(name)) {
            Ok(text) => text,
            Err(e) => {
                let message = format!("Read error: {:#}", e);
                warn!("{}: {}", name, message);
                ledger.record(name, message.clone());
                ledger.save()?;
                ctx.unit_failed(name, message);
                report.failed += 1;
                ctx.progress(index + 1, total);
                continue;
            }
        };

        let prompt = build_prompt(&options.prompt_prefix, &text);
        match translate_with_retry(&ctx, translator.as_ref(), &prompt, &options.retry, &mut report.api_calls).await {
            CallOutcome::Success(translation) => match FileManager::write_atomic(&target, &translation) {
                Ok(()) => {
                    debug!("Translated {}", name);
                    ledger.clear(name);
                    report.translated += 1;
                }
                Err(e) => {
                    let message = format!("Write error: {:#}", e);
                    warn!("{}: {}", name, message);
                    ledger.record(name, message.clone());
                    ctx.unit_failed(name, message);
                    report.failed += 1;
                }
            },
            CallOutcome::Failed(e) => {
                let message = format!("Translation error: {}", e);
                warn!("{}: {}", name, message);
                ledger.record(name, message.clone());
                if let Err(write_error) = FileManager::write_atomic(&target, &placeholder_text(&message, &text)) {
                    warn!("Failed to write placeholder for {}: {:#}", name, write_error);
                }
                ctx.unit_failed(name, message);
                report.failed += 1;
            }
            CallOutcome::Cancelled => {
                debug!("Cancelled while translating {}", name);
                break;
            }
        }

        ledger.save()?;
        ctx.progress(index + 1, total);
    }

    ledger.save()?;
    info!(
        "Translation run done: {} translated, {} skipped, {} failed, {} calls",
        report.translated, report.skipped, report.failed, report.api_calls
    );
    Ok(JobReport::Translation(report))
}

/// Call the translator until it succeeds, fails for good, or the job is cancelled
async fn translate_with_retry(
    ctx: &JobContext,
    translator: &dyn Translator,
    prompt: &str,
    policy: &RetryPolicy,
    calls: &mut usize,
) -> CallOutcome {
    let mut attempt: u32 = 1;
    loop {
        *calls += 1;
        match translator.translate(prompt).await {
            Ok(text) => return CallOutcome::Success(text),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let wait = policy.backoff_for(attempt);
                warn!("Attempt {}/{} failed ({}), retrying in {:?}", attempt, policy.max_attempts, e, wait);
                if !ctx.sleep(wait, policy.poll_interval).await {
                    return CallOutcome::Cancelled;
                }
                attempt += 1;
            }
            Err(e) => return CallOutcome::Failed(e),
        }
    }
}
