use serde::{Deserialize, Serialize};

/// Mutable state of a single research run.
///
/// Owned by one workflow run and mutated one step at a time. `web_results`
/// and `sources` grow by exactly one entry per search iteration, so both
/// always have `loop_count` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    topic: String,
    pub search_query: String,
    pub web_results: Vec<String>,
    pub sources: Vec<String>,
    pub loop_count: u32,
    pub summary: String,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Record one completed search iteration.
    pub fn record_search(&mut self, web_result: String, sources: String) {
        self.web_results.push(web_result);
        self.sources.push(sources);
        self.loop_count += 1;
    }

    pub fn latest_web_result(&self) -> Option<&str> {
        self.web_results.last().map(String::as_str)
    }

    pub fn all_sources(&self) -> String {
        self.sources.join("\n")
    }
}
