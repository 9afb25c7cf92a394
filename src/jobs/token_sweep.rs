/*!
 * Token sweep: count tokens of every raw, translated and merged file through
 * the [`MetricCache`], calling the counter only for new or modified files.
 *
 * The cache is reloaded when the sweep starts and saved after every file, so
 * a stopped sweep keeps what it counted. Entries of files that disappeared
 * are pruned only when the sweep runs to the end.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::{JobContext, JobReport};
use crate::file_utils::FileManager;
use crate::project::{MERGED_PREFIX, ProjectLayout, TRANSLATED_PREFIX, UNIT_EXTENSION};
use crate::providers::TokenCounter;
use crate::token_cache::{CacheLookup, MetricCache, StageTag, TokenCount, TokenTotals};

/// Count of one file after the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct FileTokens {
    pub name: String,
    pub stage: StageTag,
    pub count: TokenCount,
}

/// Summary of a token sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenSweepReport {
    pub per_file: Vec<FileTokens>,
    pub totals: TokenTotals,
    /// Counts taken from the cache
    pub reused: usize,
    /// Counts obtained from the counter
    pub recomputed: usize,
    pub failed: usize,
}

/// Every stage file of the project with its stage tag, stage by stage
fn sweep_targets(layout: &ProjectLayout) -> Result<Vec<(String, PathBuf, StageTag)>> {
    let stages = [
        (layout.raw_dir(), "", StageTag::Original),
        (layout.translated_dir(), TRANSLATED_PREFIX, StageTag::Translated),
        (layout.archive_dir(), MERGED_PREFIX, StageTag::Merged),
    ];

    let mut targets = Vec::new();
    for (dir, prefix, stage) in stages {
        for name in FileManager::list_stage_files(&dir, prefix, UNIT_EXTENSION)? {
            let path = dir.join(&name);
            targets.push((name, path, stage));
        }
    }
    Ok(targets)
}

pub async fn run(mut ctx: JobContext, layout: ProjectLayout, counter: Arc<dyn TokenCounter>) -> Result<JobReport> {
    let targets = sweep_targets(&layout).context("Failed to list stage files")?;
    let mut cache = MetricCache::load(layout.token_cache_path());
    let mut report = TokenSweepReport::default();
    let total = targets.len();
    info!("Token sweep over {} files", total);

    let mut completed = true;
    for (index, (name, path, stage)) in targets.iter().enumerate() {
        if !ctx.checkpoint().await {
            completed = false;
            break;
        }

        let counter = counter.clone();
        let lookup = cache
            .get_or_compute(name, path, *stage, |path| async move {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {:?}", path))?;
                Ok::<u64, anyhow::Error>(counter.count_tokens(&text).await?)
            })
            .await;

        let count = match lookup {
            CacheLookup::Cached(count) => {
                report.reused += 1;
                TokenCount::Counted(count)
            }
            CacheLookup::Computed(count) => {
                report.recomputed += 1;
                TokenCount::Counted(count)
            }
            CacheLookup::Failed => {
                report.failed += 1;
                ctx.unit_failed(name, "token count unavailable");
                TokenCount::Unavailable
            }
        };
        report.per_file.push(FileTokens {
            name: name.clone(),
            stage: *stage,
            count,
        });

        if let Err(e) = cache.save() {
            warn!("Failed to persist token cache: {:#}", e);
        }
        ctx.progress(index + 1, total);
    }

    if completed {
        let present: HashSet<String> = targets.iter().map(|(name, _, _)| name.clone()).collect();
        cache.retain_files(&present);
        cache.save()?;
    }

    report.totals = cache.totals();
    info!(
        "Token sweep done: {} reused, {} recomputed, {} failed; totals {:?}",
        report.reused, report.recomputed, report.failed, report.totals
    );
    Ok(JobReport::TokenSweep(report))
}
