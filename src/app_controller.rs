use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::app_config::Config;
use crate::errors::JobError;
use crate::jobs::download::DownloadOptions;
use crate::jobs::translate::TranslationOptions;
use crate::jobs::{
    FinishState, JobEvent, JobKind, JobRegistry, JobReport, chapter_check, clean, download, merge, token_sweep, translate,
};
use crate::project::ProjectLayout;
use crate::providers::gemini::GeminiClient;
use crate::providers::{Scraper, TokenCounter, Translator};
use crate::reconcile::{self, ContentUnit};

// @module: Project controller, the orchestration surface over one project

/// How a followed job ended, as seen by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub kind: JobKind,
    pub state: FinishState,
    pub report: Option<JobReport>,
    /// Fatal error message, if the job failed
    pub error: Option<String>,
    /// `(unit, message)` of every per-unit failure
    pub unit_failures: Vec<(String, String)>,
}

/// Orchestrates the jobs of one project
pub struct Controller {
    // @field: Stage directories
    layout: ProjectLayout,
    // @field: App configuration
    config: Config,
    // @field: Running jobs
    registry: JobRegistry,
    translator: Option<Arc<dyn Translator>>,
    token_counter: Option<Arc<dyn TokenCounter>>,
    scraper: Option<Arc<dyn Scraper>>,
}

impl Controller {
    /// Controller without any collaborator; add them with the `with_*` methods
    pub fn new(layout: ProjectLayout, config: Config) -> Self {
        Self {
            layout,
            config,
            registry: JobRegistry::new(),
            translator: None,
            token_counter: None,
            scraper: None,
        }
    }

    /// Validate the configuration and wire the Gemini client when an API key is set
    pub fn from_config<P: AsRef<Path>>(project_root: P, config: Config) -> Result<Self> {
        config.validate()?;
        let mut controller = Self::new(ProjectLayout::new(project_root), config);

        if controller.config.require_api_key().is_ok() {
            let client = Arc::new(GeminiClient::new(&controller.config.translation)?);
            let translator: Arc<dyn Translator> = client.clone();
            let token_counter: Arc<dyn TokenCounter> = client;
            controller.translator = Some(translator);
            controller.token_counter = Some(token_counter);
        } else {
            debug!("No API key configured; translation and token sweep are unavailable");
        }
        Ok(controller)
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the stage directories
    pub fn init(&self) -> Result<()> {
        self.layout.init()?;
        info!("Initialized project at {:?}", self.layout.root());
        Ok(())
    }

    /// Current unit list, rebuilt from disk
    pub fn reconcile(&self) -> Vec<ContentUnit> {
        reconcile::reconcile(&self.layout)
    }

    /// Translated files in unit order; the default selection of the file jobs
    pub fn translated_files(&self) -> Vec<PathBuf> {
        self.reconcile().into_iter().filter_map(|unit| unit.translated_path).collect()
    }

    pub async fn start_translation(&self, shutdown_requested: bool) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        let translator = self.translator.clone();
        let options = TranslationOptions::from_config(&self.config.translation, shutdown_requested);
        self.registry
            .start(JobKind::Translate, move |ctx| async move {
                let translator = translator
                    .ok_or_else(|| JobError::Configuration("Translation API key is not configured".to_string()))?;
                translate::run(ctx, layout, translator, options).await
            })
            .await
    }

    pub async fn start_clean(&self, files: Vec<PathBuf>) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        let rules = self.config.text_rules.clone();
        self.registry
            .start(JobKind::Clean, move |ctx| clean::run(ctx, layout, files, rules))
            .await
    }

    pub async fn start_chapter_check(&self, files: Vec<PathBuf>) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        let rules = self.config.text_rules.clone();
        self.registry
            .start(JobKind::ChapterCheck, move |ctx| chapter_check::run(ctx, layout, files, rules))
            .await
    }

    pub async fn start_merge(&self, files: Vec<PathBuf>) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        self.registry
            .start(JobKind::Merge, move |ctx| merge::run(ctx, layout, files))
            .await
    }

    pub async fn start_token_sweep(&self) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        let counter = self.token_counter.clone();
        self.registry
            .start(JobKind::TokenSweep, move |ctx| async move {
                let counter = counter
                    .ok_or_else(|| JobError::Configuration("Token counting API key is not configured".to_string()))?;
                token_sweep::run(ctx, layout, counter).await
            })
            .await
    }

    pub async fn start_download(&self, start_url: &str) -> mpsc::UnboundedReceiver<JobEvent> {
        let layout = self.layout.clone();
        let scraper = self.scraper.clone();
        let options = DownloadOptions::from_config(
            start_url,
            &self.config.download,
            Duration::from_millis(self.config.translation.poll_interval_ms),
        );
        self.registry
            .start(JobKind::Download, move |ctx| async move {
                let scraper = scraper.ok_or_else(|| JobError::Configuration("No page scraper configured".to_string()))?;
                download::run(ctx, layout, scraper, options).await
            })
            .await
    }

    pub fn stop(&self, kind: JobKind) -> bool {
        self.registry.stop(kind)
    }

    pub fn pause(&self, kind: JobKind) -> bool {
        self.registry.pause(kind)
    }

    pub fn resume(&self, kind: JobKind) -> bool {
        self.registry.resume(kind)
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.registry.is_running(kind)
    }

    pub fn is_paused(&self, kind: JobKind) -> bool {
        self.registry.is_paused(kind)
    }

    pub async fn join(&self, kind: JobKind) {
        self.registry.join(kind).await;
    }

    /// Stop and join every running job
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }

    /// Drain the events of a job, optionally rendering a progress bar
    pub async fn follow(events: mpsc::UnboundedReceiver<JobEvent>, show_progress: bool) -> Option<JobOutcome> {
        let progress_bar = if show_progress {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);

        let outcome = Self::collect_outcome(events, &progress_bar).await;
        progress_bar.finish_and_clear();
        outcome
    }

    async fn collect_outcome(mut events: mpsc::UnboundedReceiver<JobEvent>, progress_bar: &ProgressBar) -> Option<JobOutcome> {
        let mut error_message = None;
        let mut unit_failures = Vec::new();

        while let Some(event) = events.recv().await {
            match event {
                JobEvent::Progress { done, total } => {
                    progress_bar.set_length(total.max(done) as u64);
                    progress_bar.set_position(done as u64);
                }
                JobEvent::UnitFailed { unit, message } => {
                    progress_bar.set_message(format!("{} failed", unit));
                    unit_failures.push((unit, message));
                }
                JobEvent::Error(message) => {
                    error!("{}", message);
                    error_message = Some(message);
                }
                JobEvent::Finished { kind, state, report } => {
                    if state != FinishState::Completed {
                        warn!("{} job ended: {:?}", kind, state);
                    }
                    return Some(JobOutcome {
                        kind,
                        state,
                        report,
                        error: error_message,
                        unit_failures,
                    });
                }
            }
        }
        None
    }
}
