/*!
 * Download job: follow a chain of pages through a [`Scraper`] and store each
 * page as `raw/page_NNNN.txt`.
 *
 * The run ends when the page has no usable next link, the link points back to
 * the current page, `max_pages` is reached or the job is stopped. A failed
 * fetch aborts the job; pages already written stay on disk.
 */

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{JobContext, JobReport};
use crate::app_config::DownloadConfig;
use crate::errors::JobError;
use crate::file_utils::FileManager;
use crate::project::ProjectLayout;
use crate::providers::Scraper;

/// Settings of one download run
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub start_url: String,
    pub max_pages: Option<usize>,
    /// Wait between two fetches
    pub throttle: Duration,
    pub poll_interval: Duration,
}

impl DownloadOptions {
    pub fn from_config(start_url: &str, config: &DownloadConfig, poll_interval: Duration) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_pages: config.max_pages,
            throttle: Duration::from_millis(config.throttle_ms),
            poll_interval,
        }
    }
}

/// Summary of a download run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    pub pages: usize,
    pub files: Vec<String>,
    /// Last URL fetched successfully
    pub last_url: Option<String>,
}

/// `page_0007.txt`
pub fn page_file_name(page: usize) -> String {
    format!("page_{:04}.txt", page)
}

fn parse_web_url(url: &str) -> Option<Url> {
    Url::parse(url).ok().filter(is_web_url)
}

fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolve the next link against the current page; `None` ends the chain
fn next_page(current: &Url, next_url: Option<&str>) -> Option<Url> {
    let next = current.join(next_url?.trim()).ok()?;
    if !is_web_url(&next) || &next == current {
        return None;
    }
    Some(next)
}

pub async fn run(
    mut ctx: JobContext,
    layout: ProjectLayout,
    scraper: Arc<dyn Scraper>,
    options: DownloadOptions,
) -> Result<JobReport> {
    let mut current = parse_web_url(&options.start_url)
        .ok_or_else(|| JobError::Configuration(format!("Invalid start URL: {}", options.start_url)))?;
    FileManager::ensure_dir(layout.raw_dir())?;

    let mut report = DownloadReport::default();
    let total = options.max_pages.unwrap_or(0);
    info!("Downloading from {}", current);

    loop {
        if !ctx.checkpoint().await {
            break;
        }
        if options.max_pages.is_some_and(|max| report.pages >= max) {
            info!("Page limit of {} reached", report.pages);
            break;
        }
        if report.pages > 0 && !ctx.sleep(options.throttle, options.poll_interval).await {
            break;
        }

        let page = scraper.fetch(current.as_str()).await.map_err(JobError::from)?;
        let name = page_file_name(report.pages + 1);
        FileManager::write_atomic(layout.raw_path(&name), &page.text)?;
        debug!("Saved {} from {}", name, current);

        report.pages += 1;
        report.files.push(name);
        report.last_url = Some(current.to_string());
        ctx.progress(report.pages, total);

        match next_page(&current, page.next_url.as_deref()) {
            Some(next) => current = next,
            None => {
                debug!("No further page after {}", current);
                break;
            }
        }
    }

    info!("Downloaded {} pages", report.pages);
    Ok(JobReport::Download(report))
}
