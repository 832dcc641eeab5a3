//! Background research jobs.
//!
//! [`JobManager::submit`] registers a job and returns its id immediately; the
//! research itself runs on a spawned task. Each job first consults the result
//! cache, then runs the workflow in its own task so that a panic inside it is
//! caught and recorded as a job error instead of taking the worker down.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::cache::ResultCache;
use super::jobs::{JobStore, ResearchJob};
use super::progress::ProgressEstimator;
use crate::agents::ResearchRunner;
use crate::config::JobConfig;
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs_removed: usize,
    pub cache_entries_removed: usize,
}

#[derive(Clone)]
pub struct JobManager {
    runner: Arc<dyn ResearchRunner>,
    jobs: JobStore,
    cache: ResultCache,
    progress: ProgressEstimator,
    retention: chrono::Duration,
}

impl JobManager {
    pub fn new(runner: Arc<dyn ResearchRunner>, config: &JobConfig) -> Self {
        Self {
            runner,
            jobs: JobStore::new(),
            cache: ResultCache::new(config.cache_ttl()),
            progress: ProgressEstimator::from_config(config),
            retention: config.job_retention(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressEstimator) -> Self {
        self.progress = progress;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Register a job for `topic` and start it in the background.
    pub async fn submit(&self, topic: &str) -> AppResult<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::InvalidRequest(
                "Research topic is required".to_string(),
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        self.jobs.insert(ResearchJob::new(&job_id, topic)).await;
        info!(job_id = %job_id, topic = %topic, "Research job accepted");

        let manager = self.clone();
        let id = job_id.clone();
        let topic = topic.to_string();
        tokio::spawn(async move { manager.run(id, topic).await });

        Ok(job_id)
    }

    pub async fn get_status(&self, job_id: &str) -> AppResult<ResearchJob> {
        self.jobs
            .get(job_id)
            .await
            .ok_or_else(|| AppError::NotFound("Research job not found".to_string()))
    }

    async fn run(self, job_id: String, topic: String) {
        if let Some(result) = self.cache.get_fresh(&topic).await {
            info!(job_id = %job_id, "Serving research result from cache");
            self.jobs.complete(&job_id, result).await;
            return;
        }

        let estimator = self.progress.spawn(self.jobs.clone(), job_id.clone());

        let runner = self.runner.clone();
        let research_topic = topic.clone();
        let outcome = tokio::spawn(async move { runner.research(&research_topic).await }).await;

        match outcome {
            Ok(Ok(summary)) => {
                self.cache.insert(&topic, summary.clone()).await;
                self.jobs.complete(&job_id, summary).await;
                info!(job_id = %job_id, "Research job complete");
            }
            Ok(Err(e)) => {
                warn!(job_id = %job_id, error = %e, "Research job failed");
                self.jobs.fail(&job_id, e.to_string()).await;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Research task aborted");
                let message = if e.is_panic() {
                    "Research task panicked"
                } else {
                    "Research task was cancelled"
                };
                self.jobs.fail(&job_id, message.to_string()).await;
            }
        }

        estimator.abort();
    }

    /// Drop finished jobs past retention and cache entries past their TTL.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        // a retention longer than the representable past keeps every job
        let jobs_removed = match now.checked_sub_signed(self.retention) {
            Some(cutoff) => self.jobs.remove_finished_before(cutoff).await,
            None => 0,
        };
        let report = SweepReport {
            jobs_removed,
            cache_entries_removed: self.cache.purge_stale_at(now).await,
        };
        if report != SweepReport::default() {
            info!(
                jobs_removed = report.jobs_removed,
                cache_entries_removed = report.cache_entries_removed,
                "Swept expired jobs and cache entries"
            );
        }
        report
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                manager.sweep(Utc::now()).await;
            }
        })
    }
}
