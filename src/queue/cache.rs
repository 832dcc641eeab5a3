//! Result cache keyed by normalized topic.
//!
//! Entries carry the time they were stored. A lookup only returns an entry
//! younger than the TTL; stale entries are ignored and later overwritten or
//! purged by the sweeper.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Topics that differ only in case or surrounding whitespace share an entry.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    result: String,
}

#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_fresh(&self, topic: &str) -> Option<String> {
        self.get_fresh_at(topic, Utc::now()).await
    }

    pub async fn get_fresh_at(&self, topic: &str, now: DateTime<Utc>) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(&normalize_topic(topic))
            .filter(|entry| now - entry.stored_at <= self.ttl)
            .map(|entry| entry.result.clone())
    }

    pub async fn insert(&self, topic: &str, result: String) {
        self.insert_at(topic, result, Utc::now()).await;
    }

    pub async fn insert_at(&self, topic: &str, result: String, stored_at: DateTime<Utc>) {
        self.entries
            .write()
            .await
            .insert(normalize_topic(topic), CacheEntry { stored_at, result });
    }

    /// Remove entries older than the TTL as of `now`.
    pub async fn purge_stale_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.stored_at <= self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
