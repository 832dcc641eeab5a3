//! Best-effort parsing of JSON-mode model output.
//!
//! Model output is untrusted: it may be wrapped in code fences, be invalid
//! JSON, or miss keys. Parsing never fails outward; it yields either the
//! parsed value or a fallback tagged with the reason.

use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    Fallback { value: T, reason: String },
}

impl<T> Parsed<T> {
    pub fn or_fallback<E, F>(result: Result<T, E>, fallback: F) -> Self
    where
        E: std::fmt::Display,
        F: FnOnce() -> T,
    {
        match result {
            Ok(value) => Parsed::Value(value),
            Err(e) => Parsed::Fallback {
                value: fallback(),
                reason: e.to_string(),
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Parsed::Value(value) | Parsed::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Parsed::Value(value) | Parsed::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Parsed::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Parsed::Value(_) => None,
            Parsed::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Strip a surrounding ```json fence if present.
pub fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    }
}

pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, String> {
    serde_json::from_str(extract_json(response)).map_err(|e| format!("invalid JSON: {}", e))
}

/// Reject blank strings so a query is never empty.
pub fn non_empty(value: String, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("empty `{}`", field))
    } else {
        Ok(trimmed.to_string())
    }
}
