//! Research jobs and the in-memory job store.
//!
//! A job starts `Running` and makes exactly one transition, to `Complete` or
//! `Error`. Terminal jobs are never touched again except by the sweeper,
//! which removes them once the retention period is over.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Progress reported for a job the moment it is accepted.
pub const INITIAL_PROGRESS: u8 = 5;
/// Highest value the estimator may report before the job finishes.
pub const MAX_ESTIMATED_PROGRESS: u8 = 90;
pub const FINISHED_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchJob {
    pub id: String,
    pub topic: String,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ResearchJob {
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            status: JobStatus::Running,
            progress: INITIAL_PROGRESS,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

/// Outcome of one estimator tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Advanced(u8),
    Finished,
    Missing,
}

/// Next estimated value: never decreasing, never past `cap`.
pub fn next_progress(current: u8, step: u8, cap: u8) -> u8 {
    current.max(current.saturating_add(step).min(cap))
}

/// Shared map of job id to job. All mutations go through the write lock, so
/// an estimator tick and a completion can never interleave on one job.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, ResearchJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: ResearchJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn get(&self, id: &str) -> Option<ResearchJob> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    pub async fn running_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_running())
            .count()
    }

    /// Bump a running job's estimate. Finished or unknown jobs are left alone.
    pub async fn advance_progress(&self, id: &str, step: u8) -> ProgressUpdate {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) if job.is_running() => {
                job.progress = next_progress(job.progress, step, MAX_ESTIMATED_PROGRESS);
                ProgressUpdate::Advanced(job.progress)
            }
            Some(_) => ProgressUpdate::Finished,
            None => ProgressUpdate::Missing,
        }
    }

    /// Mark a running job complete. Returns false if it was not running.
    pub async fn complete(&self, id: &str, result: String) -> bool {
        self.finish(id, |job| {
            job.status = JobStatus::Complete;
            job.result = Some(result);
        })
        .await
    }

    /// Mark a running job failed. Returns false if it was not running.
    pub async fn fail(&self, id: &str, error: String) -> bool {
        self.finish(id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(error);
        })
        .await
    }

    async fn finish(&self, id: &str, apply: impl FnOnce(&mut ResearchJob)) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) if job.is_running() => {
                apply(job);
                job.progress = FINISHED_PROGRESS;
                job.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Drop finished jobs that finished before `cutoff`. Running jobs stay.
    pub async fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) => finished_at >= cutoff,
            None => true,
        });
        before - jobs.len()
    }
}
