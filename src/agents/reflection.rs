//! Reflection Agent
//!
//! Reads the running summary, names a knowledge gap and proposes the
//! follow-up search query for the next iteration.

use serde::Deserialize;
use tracing::{info, warn};

use super::parse::{non_empty, parse_json, Parsed};
use super::prompts;
use crate::llm::LLM;

#[derive(Debug, Deserialize)]
struct ReflectionOutput {
    #[serde(default)]
    knowledge_gap: Option<String>,
    follow_up_query: String,
}

pub struct ReflectionAgent;

impl ReflectionAgent {
    pub fn fallback_query(topic: &str) -> String {
        format!("latest developments about {}", topic)
    }

    pub async fn reflect(llm: &LLM, topic: &str, summary: &str) -> Parsed<String> {
        let outcome = llm
            .generate_json(
                &prompts::reflection_instructions(topic),
                &prompts::reflection_request(summary),
            )
            .await
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_json::<ReflectionOutput>(&raw))
            .and_then(|reflection| {
                if let Some(gap) = reflection.knowledge_gap.as_deref() {
                    info!(knowledge_gap = gap, "Knowledge gap identified");
                }
                non_empty(reflection.follow_up_query, "follow_up_query")
            });

        let parsed = Parsed::or_fallback(outcome, || Self::fallback_query(topic));
        if let Some(reason) = parsed.fallback_reason() {
            warn!(reason, "Reflection fell back to default follow-up query");
        }
        parsed
    }
}
