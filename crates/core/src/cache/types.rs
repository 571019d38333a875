//! Types for the local cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recent search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// The query text (unique key).
    pub query: String,
    /// When the query was last searched.
    pub searched_at: DateTime<Utc>,
}

impl SearchRecord {
    pub fn new(query: impl Into<String>, searched_at: DateTime<Utc>) -> Self {
        Self {
            query: query.into(),
            searched_at,
        }
    }
}

/// Errors for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}
