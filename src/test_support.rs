//! In-memory stand-ins for the text-generation and web-search ports, plus a
//! stub research runner, shared by the unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::agents::ResearchRunner;
use crate::llm::LLMAdapter;
use crate::search::{SearchAdapter, SearchError, SearchResult};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, ResponseFormat};

/// Answers query, reflection and summary prompts with fixed text.
/// A `None` response makes that call fail.
pub struct ScriptedLLM {
    query_response: Option<String>,
    reflection_response: Option<String>,
    summary_response: Option<String>,
    calls: AtomicUsize,
    summary_prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedLLM {
    fn default() -> Self {
        Self {
            query_response: Some(
                r#"{"query":"scripted query","aspect":"overview","rationale":"start broad"}"#.into(),
            ),
            reflection_response: Some(
                r#"{"knowledge_gap":"details","follow_up_query":"scripted follow-up"}"#.into(),
            ),
            summary_response: Some("scripted summary".into()),
            calls: AtomicUsize::new(0),
            summary_prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLLM {
    pub fn with_query_response(mut self, response: Option<&str>) -> Self {
        self.query_response = response.map(str::to_string);
        self
    }

    pub fn with_reflection_response(mut self, response: Option<&str>) -> Self {
        self.reflection_response = response.map(str::to_string);
        self
    }

    pub fn with_summary_response(mut self, response: Option<&str>) -> Self {
        self.summary_response = response.map(str::to_string);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.summary_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedLLM {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let system = request.messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let response = match request.response_format {
            ResponseFormat::Text => {
                if let Some(user) = request.messages.get(1) {
                    self.summary_prompts.lock().unwrap().push(user.content.clone());
                }
                &self.summary_response
            }
            ResponseFormat::JsonObject if system.contains("follow_up_query") => {
                &self.reflection_response
            }
            ResponseFormat::JsonObject => &self.query_response,
        };

        match response {
            Some(content) => Ok(LLMResponse {
                content: content.clone(),
                finish_reason: "stop".into(),
                usage: None,
            }),
            None => Err(AppError::LLMApi("scripted failure".into())),
        }
    }
}

/// Returns the same results for every query and records what was asked.
pub struct ScriptedSearch {
    results: Vec<SearchResult>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_results(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchAdapter for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: u32,
        _include_raw_content: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(SearchError::RequestFailed("scripted outage".into()));
        }
        Ok(self.results.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    Fail,
    Panic,
}

/// Research runner that sleeps, then succeeds, fails or panics.
pub struct StubRunner {
    delay: Duration,
    behavior: StubBehavior,
    calls: AtomicUsize,
}

impl StubRunner {
    pub fn new(delay: Duration, behavior: StubBehavior) -> Self {
        Self {
            delay,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Duration::ZERO, StubBehavior::Succeed)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchRunner for StubRunner {
    async fn research(&self, topic: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            StubBehavior::Succeed => Ok(format!("report for {}", topic)),
            StubBehavior::Fail => Err(AppError::Internal("runner exploded".into())),
            StubBehavior::Panic => panic!("runner panicked"),
        }
    }
}
