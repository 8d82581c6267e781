//! Result cache port and in-memory implementation.
//!
//! The cache is a memo, not a store of record: a failed read is a miss and
//! a failed write is logged and dropped, so cache trouble can never turn a
//! successful analysis into a reported failure. Entries never expire;
//! eviction is the embedding application's concern.

pub mod sqlite;

pub use sqlite::*;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::fingerprint::Fingerprint;
use crate::models::AnalysisResult;
use crate::providers::ProviderId;

/// Longest diagnostic slice of source text kept on an entry.
pub const SNIPPET_MAX_CHARS: usize = 160;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// One memoized analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub result: AnalysisResult,
    pub provider_used: ProviderId,
    pub created_at: DateTime<Utc>,
    /// Leading slice of the analyzed text, for inspection only.
    pub text_snippet: String,
}

impl CacheEntry {
    /// Builds an entry stamped now, with the snippet cut from the source
    /// text.
    pub fn new(
        key: Fingerprint,
        result: AnalysisResult,
        provider_used: ProviderId,
        source_text: &str,
    ) -> Self {
        let text_snippet = source_text.trim().chars().take(SNIPPET_MAX_CHARS).collect();
        Self {
            key,
            result,
            provider_used,
            created_at: Utc::now(),
            text_snippet,
        }
    }
}

/// Cache port. Writes for an existing key are harmless overwrites of
/// equivalent data, never merges.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

// Forwarding impl so an embedder (or test) can keep a handle on a cache the
// orchestrator owns.
impl<T: ResultCache + ?Sized> ResultCache for Arc<T> {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        (**self).put(entry)
    }
}

/// Process-local cache for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for InMemoryCache {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache mutex poisoned".to_string()))?;
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}
