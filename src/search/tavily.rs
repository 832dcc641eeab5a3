//! Tavily Search Client
//!
//! Web search through the Tavily Search API (`POST /search`). Requests carry
//! a per-request timeout and transient failures (timeouts, connection errors,
//! 429, 5xx) are retried with exponential backoff.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{SearchAdapter, SearchError, SearchResult};
use crate::config::SearchConfig;
use crate::utils::{with_retry, RetryPolicy};

pub const TAVILY_API_BASE: &str = "https://api.tavily.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct TavilyClient {
    client: Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
    topic: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchResult {
    fn from(r: TavilyResult) -> Self {
        SearchResult {
            title: r.title,
            url: r.url,
            content: r.content,
            raw_content: r.raw_content,
        }
    }
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: TAVILY_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.tavily_api_key.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .with_retry_policy(RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn execute_single_request(
        &self,
        request: &TavilyRequest<'_>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let parsed: TavilyResponse = response
                .json()
                .await
                .map_err(|e| SearchError::ParseError(e.to_string()))?;
            return Ok(parsed.results.into_iter().map(SearchResult::from).collect());
        }

        let error_text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            429 => Err(SearchError::RateLimited),
            code @ 500..=599 => Err(SearchError::ServerError(code, error_text)),
            code => Err(SearchError::HttpError(code, error_text)),
        }
    }
}

#[async_trait]
impl SearchAdapter for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, max_results, "Searching the web via Tavily");

        let request = TavilyRequest {
            query,
            max_results,
            search_depth: "basic",
            topic: "general",
            include_answer: false,
            include_raw_content,
        };

        let request = &request;
        let results = with_retry(self.retry, SearchError::is_retryable, move || {
            self.execute_single_request(request)
        })
        .await?;

        debug!(count = results.len(), "Tavily search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> TavilyClient {
        TavilyClient::new("tvly-test")
            .with_api_base(server.url())
            .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_search_parses_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_header("authorization", "Bearer tvly-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "query": "rust async",
                "max_results": 1,
                "include_raw_content": true
            })))
            .with_status(200)
            .with_body(
                r#"{"results":[
                    {"title":"Async Rust","url":"https://example.com/a","content":"snippet","raw_content":"full page","score":0.9},
                    {"title":"No Raw","url":"https://example.com/b","content":"other","raw_content":null}
                ]}"#,
            )
            .create_async()
            .await;

        let results = client_for(&server).search("rust async", 1, true).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Async Rust");
        assert_eq!(results[0].raw_content.as_deref(), Some("full page"));
        assert_eq!(results[1].raw_content, None);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let err = client_for(&server).search("q", 1, true).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SearchError::ServerError(503, _)));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(401)
            .with_body("bad key")
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server).search("q", 1, true).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SearchError::HttpError(401, _)));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let err = TavilyClient::new("").search("q", 1, true).await.unwrap_err();
        assert!(matches!(err, SearchError::NoApiKey));
    }
}
