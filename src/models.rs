use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::agents::ResearchRunner;
use crate::config::Config;
use crate::queue::{JobManager, JobStatus, ResearchJob};
use crate::types::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jobs: JobManager,
    pub workflow: Arc<dyn ResearchRunner>,
}

impl AppState {
    pub fn new(config: Config, workflow: Arc<dyn ResearchRunner>) -> Self {
        let jobs = JobManager::new(workflow.clone(), &config.jobs);
        Self {
            config,
            jobs,
            workflow,
        }
    }
}

fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.trim().is_empty() {
        return Err(ValidationError::new("blank_topic"));
    }
    Ok(())
}

// A missing field deserializes as blank so it is reported like an empty one.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct ResearchRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_topic"))]
    pub research_topic: String,
}

impl ResearchRequest {
    /// The trimmed topic, or an error if there is none.
    pub fn topic(&self) -> Result<&str, AppError> {
        self.validate()
            .map_err(|_| AppError::InvalidRequest("Research topic is required".to_string()))?;
        Ok(self.research_topic.trim())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StartResearchResponse {
    pub research_id: String,
    pub status: String,
}

impl StartResearchResponse {
    pub fn started(research_id: String) -> Self {
        Self {
            research_id,
            status: "started".to_string(),
        }
    }
}

#[derive(Debug, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResearchStatusResponse {
    Running { progress: u8 },
    Complete { summary: String, progress: u8 },
    Error { error: String, progress: u8 },
}

impl From<ResearchJob> for ResearchStatusResponse {
    fn from(job: ResearchJob) -> Self {
        match job.status {
            JobStatus::Running => Self::Running {
                progress: job.progress,
            },
            JobStatus::Complete => Self::Complete {
                summary: job.result.unwrap_or_default(),
                progress: job.progress,
            },
            JobStatus::Error => Self::Error {
                error: job.error.unwrap_or_default(),
                progress: job.progress,
            },
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SyncResearchResponse {
    pub summary: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub active_jobs: usize,
    pub cached_results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_topic_validation() {
        let ok: ResearchRequest =
            serde_json::from_str(r#"{"research_topic":"  rust  "}"#).unwrap();
        assert_eq!(ok.topic().unwrap(), "rust");

        for body in [r#"{"research_topic":"   "}"#, r#"{"research_topic":""}"#, "{}"] {
            let request: ResearchRequest = serde_json::from_str(body).unwrap();
            assert!(matches!(request.topic(), Err(AppError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_status_response_shapes() {
        let mut job = ResearchJob::new("id", "topic");
        job.progress = 35;
        assert_eq!(
            serde_json::to_value(ResearchStatusResponse::from(job.clone())).unwrap(),
            serde_json::json!({"status": "running", "progress": 35})
        );

        job.status = JobStatus::Complete;
        job.progress = 100;
        job.result = Some("## Summary".into());
        assert_eq!(
            serde_json::to_value(ResearchStatusResponse::from(job.clone())).unwrap(),
            serde_json::json!({"status": "complete", "summary": "## Summary", "progress": 100})
        );

        job.status = JobStatus::Error;
        job.error = Some("boom".into());
        assert_eq!(
            serde_json::to_value(ResearchStatusResponse::from(job)).unwrap(),
            serde_json::json!({"status": "error", "error": "boom", "progress": 100})
        );
    }
}
