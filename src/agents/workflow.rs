//! Research workflow engine
//!
//! Drives one [`ResearchState`] through the step machine
//! `GenerateQuery -> WebResearch -> Summarize -> Reflect -> (WebResearch | Finalize)`.
//! Steps run strictly in sequence; the only suspension points are the calls
//! into the text-generation and web-search ports. Every port failure degrades
//! to placeholder content, so a run with a valid topic always finalizes.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::query::QueryAgent;
use super::reflection::ReflectionAgent;
use super::state::ResearchState;
use super::summarizer::SummarizerAgent;
use crate::config::Config;
use crate::llm::LLM;
use crate::search::{deduplicate_and_format_sources, format_sources, SearchAdapter, TavilyClient};
use crate::types::{AppError, AppResult};

pub const NO_RESULTS_TEXT: &str =
    "No search results found. The search may have failed or returned no results.";
pub const NO_SOURCES_TEXT: &str = "No sources available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    GenerateQuery,
    WebResearch,
    Summarize,
    Reflect,
    Finalize,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_web_research_loops: u32,
    pub max_results: u32,
    pub max_tokens_per_source: usize,
    pub include_raw_content: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_web_research_loops: 3,
            max_results: 1,
            max_tokens_per_source: 1000,
            include_raw_content: true,
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_web_research_loops: config.research.max_web_research_loops,
            max_results: config.search.max_results,
            max_tokens_per_source: config.search.max_tokens_per_source,
            include_raw_content: config.search.include_raw_content,
        }
    }
}

/// Final state of a run plus the steps it went through, in order.
#[derive(Debug, Clone)]
pub struct ResearchRun {
    pub state: ResearchState,
    pub trace: Vec<WorkflowStep>,
}

impl ResearchRun {
    pub fn step_count(&self, step: WorkflowStep) -> usize {
        self.trace.iter().filter(|s| **s == step).count()
    }
}

/// Routing after reflection.
///
/// `loop_count` has already been incremented by the search that just ran, and
/// the comparison is strict: a bound of N performs exactly N searches, and any
/// bound below 1 still performs the one search every run starts with.
pub fn route_research(loop_count: u32, max_web_research_loops: u32) -> WorkflowStep {
    if loop_count < max_web_research_loops {
        WorkflowStep::WebResearch
    } else {
        WorkflowStep::Finalize
    }
}

pub fn finalize_summary(state: &ResearchState) -> String {
    format!(
        "## Summary\n\n{}\n\n### Sources:\n{}",
        state.summary,
        state.all_sources()
    )
}

/// Something that turns a topic into a final research report.
#[async_trait]
pub trait ResearchRunner: Send + Sync {
    async fn research(&self, topic: &str) -> AppResult<String>;
}

pub struct ResearchWorkflow {
    llm: LLM,
    search: Arc<dyn SearchAdapter>,
    settings: WorkflowSettings,
}

impl ResearchWorkflow {
    pub fn new(llm: LLM, search: Arc<dyn SearchAdapter>, settings: WorkflowSettings) -> Self {
        Self {
            llm,
            search,
            settings,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            LLM::new(&config.llm),
            Arc::new(TavilyClient::from_config(&config.search)),
            WorkflowSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn with_max_loops(mut self, max_web_research_loops: u32) -> Self {
        self.settings.max_web_research_loops = max_web_research_loops;
        self
    }

    #[instrument(skip(self), fields(max_loops = self.settings.max_web_research_loops))]
    pub async fn run(&self, topic: &str) -> AppResult<ResearchRun> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::InvalidRequest(
                "Research topic is required".to_string(),
            ));
        }

        info!("Starting research workflow");
        let mut state = ResearchState::new(topic);
        let mut trace = Vec::new();
        let mut next = Some(WorkflowStep::GenerateQuery);

        while let Some(step) = next {
            trace.push(step);
            next = self.execute_step(step, &mut state).await;
        }

        info!(
            loops = state.loop_count,
            summary_len = state.summary.len(),
            "Research workflow complete"
        );
        Ok(ResearchRun { state, trace })
    }

    /// Run one step and return the step to run next, `None` once finalized.
    async fn execute_step(
        &self,
        step: WorkflowStep,
        state: &mut ResearchState,
    ) -> Option<WorkflowStep> {
        match step {
            WorkflowStep::GenerateQuery => {
                state.search_query = QueryAgent::generate_query(&self.llm, state.topic())
                    .await
                    .into_value();
                info!(query = %state.search_query, "Initial query ready");
                Some(WorkflowStep::WebResearch)
            }
            WorkflowStep::WebResearch => {
                self.web_research(state).await;
                Some(WorkflowStep::Summarize)
            }
            WorkflowStep::Summarize => {
                let latest = state.latest_web_result().unwrap_or(NO_RESULTS_TEXT);
                state.summary =
                    SummarizerAgent::summarize(&self.llm, state.topic(), &state.summary, latest)
                        .await;
                Some(WorkflowStep::Reflect)
            }
            WorkflowStep::Reflect => {
                state.search_query =
                    ReflectionAgent::reflect(&self.llm, state.topic(), &state.summary)
                        .await
                        .into_value();
                let next = route_research(state.loop_count, self.settings.max_web_research_loops);
                info!(
                    loop_count = state.loop_count,
                    follow_up = %state.search_query,
                    next = ?next,
                    "Routing after reflection"
                );
                Some(next)
            }
            WorkflowStep::Finalize => {
                state.summary = finalize_summary(state);
                None
            }
        }
    }

    async fn web_research(&self, state: &mut ResearchState) {
        let results = match self
            .search
            .search(
                &state.search_query,
                self.settings.max_results,
                self.settings.include_raw_content,
            )
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, query = %state.search_query, "Web search failed");
                Vec::new()
            }
        };

        if results.is_empty() {
            warn!(query = %state.search_query, "No search results found");
            state.record_search(NO_RESULTS_TEXT.to_string(), NO_SOURCES_TEXT.to_string());
        } else {
            state.record_search(
                deduplicate_and_format_sources(
                    &results,
                    self.settings.max_tokens_per_source,
                    self.settings.include_raw_content,
                ),
                format_sources(&results),
            );
        }

        info!(loop_count = state.loop_count, results = results.len(), "Web research iteration done");
    }
}

#[async_trait]
impl ResearchRunner for ResearchWorkflow {
    async fn research(&self, topic: &str) -> AppResult<String> {
        Ok(self.run(topic).await?.state.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchResult;
    use crate::test_support::{ScriptedLLM, ScriptedSearch};

    fn workflow(llm: &Arc<ScriptedLLM>, search: &Arc<ScriptedSearch>, max_loops: u32) -> ResearchWorkflow {
        ResearchWorkflow::new(
            LLM::with_adapter(llm.clone(), "test-model"),
            search.clone(),
            WorkflowSettings {
                max_web_research_loops: max_loops,
                ..WorkflowSettings::default()
            },
        )
    }

    #[test]
    fn test_route_research_is_strict() {
        assert_eq!(route_research(1, 3), WorkflowStep::WebResearch);
        assert_eq!(route_research(2, 3), WorkflowStep::WebResearch);
        assert_eq!(route_research(3, 3), WorkflowStep::Finalize);
        assert_eq!(route_research(1, 1), WorkflowStep::Finalize);
        assert_eq!(route_research(1, 0), WorkflowStep::Finalize);
    }

    #[tokio::test]
    async fn test_iteration_counts_follow_loop_bound() {
        for (max_loops, expected) in [(0u32, 1usize), (1, 1), (3, 3)] {
            let llm = Arc::new(ScriptedLLM::default());
            let search = Arc::new(ScriptedSearch::with_results(vec![SearchResult {
                title: "Doc".into(),
                url: "https://example.com/doc".into(),
                content: "snippet".into(),
                raw_content: Some("body".into()),
            }]));

            let run = workflow(&llm, &search, max_loops).run("topic").await.unwrap();

            assert_eq!(run.state.loop_count as usize, expected, "max_loops={}", max_loops);
            assert_eq!(run.step_count(WorkflowStep::WebResearch), expected);
            assert_eq!(run.step_count(WorkflowStep::Summarize), expected);
            assert_eq!(run.step_count(WorkflowStep::Reflect), expected);
            assert_eq!(run.step_count(WorkflowStep::Finalize), 1);
            assert_eq!(run.state.web_results.len(), expected);
            assert_eq!(run.state.sources.len(), expected);
            assert_eq!(search.call_count(), expected);
        }
    }

    #[tokio::test]
    async fn test_quantum_computing_single_loop() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![SearchResult {
            title: "Quantum Computing".into(),
            url: "https://example.com/qc".into(),
            content: "Qubits and superposition".into(),
            raw_content: Some("Long article".into()),
        }]));

        let run = workflow(&llm, &search, 1).run("quantum computing").await.unwrap();

        assert_eq!(
            run.trace,
            vec![
                WorkflowStep::GenerateQuery,
                WorkflowStep::WebResearch,
                WorkflowStep::Summarize,
                WorkflowStep::Reflect,
                WorkflowStep::Finalize,
            ]
        );
        let summary = &run.state.summary;
        assert!(summary.starts_with("## Summary\n\n"));
        assert!(summary.contains("### Sources:\n* Quantum Computing : https://example.com/qc"));
        assert_eq!(search.queries(), vec!["scripted query".to_string()]);
    }

    #[tokio::test]
    async fn test_follow_up_query_feeds_next_search() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        workflow(&llm, &search, 2).run("topic").await.unwrap();

        assert_eq!(
            search.queries(),
            vec!["scripted query".to_string(), "scripted follow-up".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unparseable_query_falls_back() {
        let llm = Arc::new(ScriptedLLM::default().with_query_response(Some("not json at all")));
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        workflow(&llm, &search, 1).run("rust lifetimes").await.unwrap();

        assert_eq!(search.queries(), vec!["information about rust lifetimes".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_query_key_and_generation_error_fall_back() {
        for response in [Some(r#"{"aspect":"a","rationale":"r"}"#), Some(r#"{"query":"  "}"#), None] {
            let llm = Arc::new(ScriptedLLM::default().with_query_response(response));
            let search = Arc::new(ScriptedSearch::with_results(vec![]));

            workflow(&llm, &search, 1).run("tides").await.unwrap();

            assert_eq!(search.queries(), vec!["information about tides".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_reflection_fallback_query() {
        let llm = Arc::new(ScriptedLLM::default().with_reflection_response(Some("{}")));
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        let run = workflow(&llm, &search, 2).run("tides").await.unwrap();

        assert_eq!(search.queries()[1], "latest developments about tides");
        assert_eq!(run.state.search_query, "latest developments about tides");
    }

    #[tokio::test]
    async fn test_empty_search_uses_placeholder_and_finalizes() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        let run = workflow(&llm, &search, 1).run("obscure topic").await.unwrap();

        assert_eq!(run.state.web_results, vec![NO_RESULTS_TEXT.to_string()]);
        assert_eq!(run.state.sources, vec![NO_SOURCES_TEXT.to_string()]);
        assert_eq!(run.trace.last(), Some(&WorkflowStep::Finalize));
        assert!(!run.state.summary.is_empty());
        assert!(run.state.summary.ends_with("### Sources:\nNo sources available"));
    }

    #[tokio::test]
    async fn test_search_failure_is_treated_as_no_results() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::failing());

        let run = workflow(&llm, &search, 1).run("topic").await.unwrap();

        assert_eq!(run.state.web_results, vec![NO_RESULTS_TEXT.to_string()]);
        assert_eq!(run.state.loop_count, 1);
    }

    #[tokio::test]
    async fn test_summary_failure_uses_error_placeholder() {
        let llm = Arc::new(ScriptedLLM::default().with_summary_response(None));
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        let run = workflow(&llm, &search, 1).run("volcanoes").await.unwrap();

        assert!(run
            .state
            .summary
            .starts_with("## Summary\n\nError generating summary for volcanoes."));
    }

    #[tokio::test]
    async fn test_second_summary_extends_the_first() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        workflow(&llm, &search, 2).run("topic").await.unwrap();

        let prompts = llm.summary_prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].starts_with("Generate a summary of these search results:"));
        assert!(prompts[1].starts_with("Extend the existing summary: scripted summary"));
    }

    #[tokio::test]
    async fn test_blank_topic_is_rejected() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![]));

        let err = workflow(&llm, &search, 1).run("   ").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(search.call_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sources_accumulate_across_iterations() {
        let llm = Arc::new(ScriptedLLM::default());
        let search = Arc::new(ScriptedSearch::with_results(vec![SearchResult {
            title: "Same".into(),
            url: "https://example.com/same".into(),
            content: "c".into(),
            raw_content: None,
        }]));

        let run = workflow(&llm, &search, 2).run("topic").await.unwrap();

        assert!(run.state.summary.ends_with(
            "### Sources:\n* Same : https://example.com/same\n* Same : https://example.com/same"
        ));
    }
}
