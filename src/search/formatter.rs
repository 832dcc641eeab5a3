//! Source formatting
//!
//! Turns raw search hits into the two renderings the workflow stores per
//! iteration: a long "Sources:" block fed to the summarizer as context, and a
//! short "* title : url" list used as the citation footer.

use std::collections::HashSet;
use tracing::warn;

use super::SearchResult;

/// Roughly four characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Drop later hits whose URL was already seen. Order is preserved.
pub fn deduplicate(results: &[SearchResult]) -> Vec<&SearchResult> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|source| seen.insert(source.url.as_str()))
        .collect()
}

/// Cut `raw` to `max_tokens * CHARS_PER_TOKEN` characters, marking the cut.
pub fn truncate_content(raw: &str, max_tokens: usize) -> String {
    let char_limit = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match raw.char_indices().nth(char_limit) {
        Some((byte_idx, _)) => format!("{}{}", &raw[..byte_idx], TRUNCATION_MARKER),
        None => raw.to_string(),
    }
}

/// Render deduplicated sources as LLM context.
pub fn deduplicate_and_format_sources(
    results: &[SearchResult],
    max_tokens_per_source: usize,
    include_raw_content: bool,
) -> String {
    let mut formatted = String::from("Sources:\n\n");

    for source in deduplicate(results) {
        formatted.push_str(&format!("Source {}:\n===\n", source.title));
        formatted.push_str(&format!("URL: {}\n===\n", source.url));
        formatted.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            source.content
        ));

        if include_raw_content {
            let raw = match &source.raw_content {
                Some(raw) => raw.as_str(),
                None => {
                    warn!(url = %source.url, "No raw content for source");
                    ""
                }
            };
            formatted.push_str(&format!(
                "Full source content limited to {} tokens: {}\n\n",
                max_tokens_per_source,
                truncate_content(raw, max_tokens_per_source)
            ));
        }
    }

    formatted.trim().to_string()
}

/// Render deduplicated sources as a bullet list of citations.
pub fn format_sources(results: &[SearchResult]) -> String {
    deduplicate(results)
        .iter()
        .map(|source| format!("* {} : {}", source.title, source.url))
        .collect::<Vec<_>>()
        .join("\n")
}
