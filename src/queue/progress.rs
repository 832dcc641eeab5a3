//! Progress estimation for running jobs.
//!
//! The workflow does not report progress, so a background task advances the
//! job's estimate by a fixed step on every tick. The estimate never goes past
//! [`MAX_ESTIMATED_PROGRESS`](super::jobs::MAX_ESTIMATED_PROGRESS) and the
//! task stops on the first tick after the job leaves `Running`.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::jobs::{JobStore, ProgressUpdate};
use crate::config::JobConfig;

#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    interval: Duration,
    step: u8,
}

impl ProgressEstimator {
    pub fn new(interval: Duration, step: u8) -> Self {
        Self { interval, step }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(config.progress_interval(), config.progress_step)
    }

    pub fn spawn(self, jobs: JobStore, job_id: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(self.interval).await;
                match jobs.advance_progress(&job_id, self.step).await {
                    ProgressUpdate::Advanced(_) => {}
                    ProgressUpdate::Finished | ProgressUpdate::Missing => break,
                }
            }
            debug!(job_id = %job_id, "Progress estimator stopped");
        })
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::from_config(&JobConfig::default())
    }
}
