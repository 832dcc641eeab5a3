//! Search Module
//!
//! Web search capability consumed by the research workflow:
//! - [`SearchAdapter`] - the port the workflow depends on
//! - [`TavilyClient`] - Tavily Search API implementation
//! - [`formatter`] - dedupe, truncation and rendering of results for prompts and citations

pub mod formatter;
pub mod tavily;

pub use formatter::{deduplicate_and_format_sources, format_sources};
pub use tavily::TavilyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Snippet most relevant to the query
    pub content: String,
    /// Full page content, when requested and available
    pub raw_content: Option<String>,
}

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not configured")]
    NoApiKey,

    #[error("Search request timed out")]
    Timeout,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited by search provider")]
    RateLimited,

    #[error("Search server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Search HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

impl SearchError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::RequestFailed(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }
}

impl From<SearchError> for crate::types::AppError {
    fn from(e: SearchError) -> Self {
        crate::types::AppError::Search(e.to_string())
    }
}

#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<Vec<SearchResult>, SearchError>;
}
