//! Query Agent
//!
//! Turns the research topic into the first web search query.

use serde::Deserialize;
use tracing::{info, warn};

use super::parse::{non_empty, parse_json, Parsed};
use super::prompts;
use crate::llm::LLM;

/// JSON shape requested from the model
#[derive(Debug, Deserialize)]
struct QueryPlan {
    query: String,
    #[serde(default)]
    aspect: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

pub struct QueryAgent;

impl QueryAgent {
    pub fn fallback_query(topic: &str) -> String {
        format!("information about {}", topic)
    }

    /// Generate the initial search query. Never fails: generation or parse
    /// errors yield [`QueryAgent::fallback_query`].
    pub async fn generate_query(llm: &LLM, topic: &str) -> Parsed<String> {
        let outcome = llm
            .generate_json(
                &prompts::query_writer_instructions(topic),
                prompts::QUERY_WRITER_REQUEST,
            )
            .await
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_json::<QueryPlan>(&raw))
            .and_then(|plan| {
                info!(
                    aspect = plan.aspect.as_deref().unwrap_or(""),
                    rationale = plan.rationale.as_deref().unwrap_or(""),
                    "Query plan generated"
                );
                non_empty(plan.query, "query")
            });

        let parsed = Parsed::or_fallback(outcome, || Self::fallback_query(topic));
        if let Some(reason) = parsed.fallback_reason() {
            warn!(reason, "Query generation fell back to default query");
        }
        parsed
    }
}
