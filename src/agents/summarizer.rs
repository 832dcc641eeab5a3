//! Summarizer Agent
//!
//! Writes the running summary from the latest search results, either from
//! scratch or by extending what earlier iterations produced.

use tracing::{error, info};

use super::prompts;
use crate::llm::LLM;

pub struct SummarizerAgent;

impl SummarizerAgent {
    pub fn error_summary(topic: &str) -> String {
        format!("Error generating summary for {}.", topic)
    }

    /// Returns the new running summary. Generation failures and blank output
    /// yield [`SummarizerAgent::error_summary`] so the run can continue.
    pub async fn summarize(
        llm: &LLM,
        topic: &str,
        existing_summary: &str,
        latest_web_result: &str,
    ) -> String {
        let request = if existing_summary.is_empty() {
            prompts::new_summary_request(latest_web_result, topic)
        } else {
            prompts::extend_summary_request(existing_summary, latest_web_result, topic)
        };

        match llm.generate(prompts::SUMMARIZER_INSTRUCTIONS, &request).await {
            Ok(summary) if !summary.trim().is_empty() => {
                info!(
                    summary_len = summary.len(),
                    extended = !existing_summary.is_empty(),
                    "Summary updated"
                );
                summary.trim().to_string()
            }
            Ok(_) => {
                error!(topic, "Model returned an empty summary");
                Self::error_summary(topic)
            }
            Err(e) => {
                error!(error = %e, topic, "Summarization failed");
                Self::error_summary(topic)
            }
        }
    }
}
