/*!
 * Background job framework.
 *
 * Every long-running operation (download, translate, clean, chapter-check,
 * merge, token sweep) runs as a tokio task wrapped in a [`TaskHandle`]:
 * - `stop()` requests cooperative cancellation, polled by the work loop at the
 *   top of every item and inside every sleep
 * - `pause()`/`resume()` close and open a gate the work loop awaits before
 *   each item
 * - progress, per-unit failures, fatal errors and a single terminal
 *   `Finished` event are delivered over an unbounded channel
 */

use anyhow::Result;
use futures::FutureExt;
use log::{debug, error, info};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub mod chapter_check;
pub mod clean;
pub mod download;
pub mod merge;
pub mod registry;
pub mod token_sweep;
pub mod translate;

pub use chapter_check::ChapterCheckReport;
pub use clean::CleanReport;
pub use download::DownloadReport;
pub use merge::MergeReport;
pub use registry::JobRegistry;
pub use token_sweep::TokenSweepReport;
pub use translate::TranslationReport;

/// Kinds of background jobs; at most one of each runs per project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Download,
    Translate,
    Clean,
    ChapterCheck,
    Merge,
    TokenSweep,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Download => "download",
            Self::Translate => "translate",
            Self::Clean => "clean",
            Self::ChapterCheck => "chapter-check",
            Self::Merge => "merge",
            Self::TokenSweep => "token-sweep",
        };
        write!(f, "{}", name)
    }
}

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishState {
    Completed,
    Cancelled,
    Failed,
}

/// Result summary of a job that returned normally
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Download(DownloadReport),
    Translation(TranslationReport),
    Clean(CleanReport),
    ChapterCheck(ChapterCheckReport),
    Merge(MergeReport),
    TokenSweep(TokenSweepReport),
}

/// Signals emitted by a running job
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// `done` items out of `total` processed; `done` strictly increases
    Progress { done: usize, total: usize },
    /// A single unit failed; the job goes on
    UnitFailed { unit: String, message: String },
    /// Fatal condition; always followed by `Finished { state: Failed, .. }`
    Error(String),
    /// Last event of every job
    Finished {
        kind: JobKind,
        state: FinishState,
        report: Option<JobReport>,
    },
}

/// Cancel and pause switches shared by a handle and its work loop
#[derive(Debug, Clone)]
pub struct JobControl {
    cancel: Arc<watch::Sender<bool>>,
    pause: Arc<watch::Sender<bool>>,
}

impl JobControl {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        let (pause, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
            pause: Arc::new(pause),
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.send_replace(paused);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Resolves once the job is not paused, or is cancelled
    async fn resumed_or_cancelled(&self) {
        let mut pause_rx = self.pause.subscribe();
        tokio::select! {
            _ = pause_rx.wait_for(|paused| !*paused) => {}
            _ = self.cancelled() => {}
        }
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

/// What a work loop sees of its job
pub struct JobContext {
    kind: JobKind,
    control: JobControl,
    events: mpsc::UnboundedSender<JobEvent>,
    last_done: usize,
}

impl JobContext {
    fn new(kind: JobKind, control: JobControl, events: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { kind, control, events, last_done: 0 }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Per-item gate: waits while paused. Returns `false` once the job must stop.
    pub async fn checkpoint(&self) -> bool {
        if self.control.is_paused() && !self.control.is_cancelled() {
            debug!("{} job paused", self.kind);
            self.control.resumed_or_cancelled().await;
            debug!("{} job resumed", self.kind);
        }
        !self.control.is_cancelled()
    }

    /// Sleep for `duration` in slices of at most `slice`, waiting at the pause
    /// gate between slices so paused time does not count. Returns `false` as
    /// soon as the job is cancelled.
    pub async fn sleep(&self, duration: Duration, slice: Duration) -> bool {
        let slice = if slice.is_zero() { duration } else { slice };
        let mut remaining = duration;

        while !remaining.is_zero() {
            if !self.checkpoint().await {
                return false;
            }
            let step = remaining.min(slice);
            tokio::select! {
                _ = tokio::time::sleep(step) => {}
                _ = self.control.cancelled() => return false,
            }
            remaining = remaining.saturating_sub(step);
        }

        !self.control.is_cancelled()
    }

    /// Report progress. Non-increasing values are dropped.
    pub fn progress(&mut self, done: usize, total: usize) {
        if done <= self.last_done {
            return;
        }
        self.last_done = done;
        let _ = self.events.send(JobEvent::Progress { done, total });
    }

    /// Report a per-unit failure
    pub fn unit_failed(&self, unit: &str, message: impl Into<String>) {
        let _ = self.events.send(JobEvent::UnitFailed {
            unit: unit.to_string(),
            message: message.into(),
        });
    }
}

/// One running background job
pub struct TaskHandle {
    kind: JobKind,
    control: JobControl,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn `work` on the tokio runtime. Must be called from within a runtime.
    ///
    /// `Finished` is sent exactly once, after the work future has been dropped,
    /// whether it completed, observed cancellation, returned an error or panicked.
    pub fn start<F, Fut>(kind: JobKind, work: F) -> (Self, mpsc::UnboundedReceiver<JobEvent>)
    where
        F: FnOnce(JobContext) -> Fut,
        Fut: Future<Output = Result<JobReport>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = JobControl::new();
        let future = work(JobContext::new(kind, control.clone(), tx.clone()));
        let job_control = control.clone();

        info!("Starting {} job", kind);
        let join = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(future).catch_unwind().await;
            let (state, report) = match outcome {
                Ok(Ok(report)) if job_control.is_cancelled() => (FinishState::Cancelled, Some(report)),
                Ok(Ok(report)) => (FinishState::Completed, Some(report)),
                Ok(Err(e)) => {
                    error!("{} job failed: {:#}", kind, e);
                    let _ = tx.send(JobEvent::Error(format!("{:#}", e)));
                    (FinishState::Failed, None)
                }
                Err(_) => {
                    error!("{} job panicked", kind);
                    let _ = tx.send(JobEvent::Error(format!("{} job panicked", kind)));
                    (FinishState::Failed, None)
                }
            };
            info!("{} job finished: {:?}", kind, state);
            let _ = tx.send(JobEvent::Finished { kind, state, report });
        });

        let handle = Self {
            kind,
            control,
            join: Some(join),
        };
        (handle, rx)
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Request cooperative cancellation
    pub fn stop(&self) {
        debug!("Stop requested for {} job", self.kind);
        self.control.cancel();
    }

    pub fn pause(&self) {
        self.control.set_paused(true);
    }

    pub fn resume(&self) {
        self.control.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Whether the task has not finished yet
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Wait for the task to end
    pub async fn join(&mut self) {
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!("{} job task did not complete: {}", self.kind, e);
            }
        }
    }
}
