//! Persistent result cache on SQLite.
//!
//! One table, keyed by fingerprint. The result is stored as canonical JSON
//! text and timestamps as RFC 3339, so the file is inspectable with any
//! sqlite3 shell.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CacheEntry, CacheError, ResultCache};
use crate::fingerprint::Fingerprint;
use crate::providers::ProviderId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS analysis_cache (
    key TEXT PRIMARY KEY,
    result_json TEXT NOT NULL,
    provider_used TEXT NOT NULL,
    created_at TEXT NOT NULL,
    text_snippet TEXT NOT NULL
)";

/// File-backed cache. The connection is behind a mutex; contention is
/// negligible next to the provider calls this cache fronts.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (or creates) the cache at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cache with the same schema in memory, for tests.
    pub fn open_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Unavailable("cache connection mutex poisoned".to_string()))
    }
}

impl ResultCache for SqliteCache {
    fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT result_json, provider_used, created_at, text_snippet
             FROM analysis_cache
             WHERE key = ?1
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![key.as_str()], |row| row_to_entry(key, row))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let result_json = serde_json::to_string(&entry.result)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO analysis_cache (key, result_json, provider_used, created_at, text_snippet)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
               result_json = excluded.result_json,
               provider_used = excluded.provider_used,
               created_at = excluded.created_at,
               text_snippet = excluded.text_snippet",
            params![
                entry.key.as_str(),
                result_json,
                entry.provider_used.as_str(),
                entry.created_at.to_rfc3339(),
                entry.text_snippet,
            ],
        )?;
        Ok(())
    }
}

fn row_to_entry(key: &Fingerprint, row: &rusqlite::Row) -> Result<CacheEntry, rusqlite::Error> {
    let result_json: String = row.get(0)?;
    let provider: String = row.get(1)?;
    let created_str: String = row.get(2)?;

    let result = serde_json::from_str(&result_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(CacheEntry {
        key: key.clone(),
        result,
        provider_used: ProviderId::new(provider),
        created_at,
        text_snippet: row.get(3)?,
    })
}
