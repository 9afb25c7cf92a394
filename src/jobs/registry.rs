//! Registry enforcing at most one running job per kind.

use anyhow::Result;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::mpsc;

use super::{JobContext, JobEvent, JobKind, JobReport, TaskHandle};

/// Running jobs of one project, keyed by kind
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobKind, TaskHandle>>,
    // Serializes start() so a stop-join-register sequence is never interleaved
    starting: tokio::sync::Mutex<()>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a job of `kind`, first stopping and joining any previous one of the same kind
    pub async fn start<F, Fut>(&self, kind: JobKind, work: F) -> mpsc::UnboundedReceiver<JobEvent>
    where
        F: FnOnce(JobContext) -> Fut,
        Fut: Future<Output = Result<JobReport>> + Send + 'static,
    {
        let _guard = self.starting.lock().await;

        let previous = self.jobs.lock().remove(&kind);
        if let Some(mut previous) = previous {
            debug!("Replacing previous {} job", kind);
            previous.stop();
            previous.join().await;
        }

        let (handle, events) = TaskHandle::start(kind, work);
        self.jobs.lock().insert(kind, handle);
        events
    }

    /// Request cancellation. Returns whether a job of that kind was registered.
    pub fn stop(&self, kind: JobKind) -> bool {
        match self.jobs.lock().get(&kind) {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn pause(&self, kind: JobKind) -> bool {
        match self.jobs.lock().get(&kind) {
            Some(handle) => {
                handle.pause();
                true
            }
            None => false,
        }
    }

    pub fn resume(&self, kind: JobKind) -> bool {
        match self.jobs.lock().get(&kind) {
            Some(handle) => {
                handle.resume();
                true
            }
            None => false,
        }
    }

    pub fn is_paused(&self, kind: JobKind) -> bool {
        self.jobs.lock().get(&kind).is_some_and(TaskHandle::is_paused)
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.jobs.lock().get(&kind).is_some_and(TaskHandle::is_running)
    }

    /// Wait for the job of `kind` to end and forget it
    pub async fn join(&self, kind: JobKind) {
        let handle = self.jobs.lock().remove(&kind);
        if let Some(mut handle) = handle {
            handle.join().await;
        }
    }

    /// Stop and join every job
    pub async fn shutdown(&self) {
        let handles: Vec<TaskHandle> = self.jobs.lock().drain().map(|(_, handle)| handle).collect();
        for mut handle in handles {
            handle.stop();
            handle.join().await;
        }
    }
}
