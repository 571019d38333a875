//! Remote movie source.
//!
//! The reconciliation engine only depends on the [`MovieSource`] trait; the
//! TMDB HTTP client is the production implementation.

mod tmdb;

pub use tmdb::{TmdbClient, TmdbConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::movie::MoviePage;

/// Errors that can occur when talking to the remote source.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connect, timeout, TLS...).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing or rejected API key).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Parameters of a remote movie search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub language: String,
    pub page: u32,
    pub include_adult: bool,
}

impl SearchParams {
    /// First page, adult content excluded.
    pub fn new(query: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: language.into(),
            page: 1,
            include_adult: false,
        }
    }
}

/// A remote source of movie listings.
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Fetch the first page of this week's trending movies.
    async fn fetch_trending(&self, language: &str) -> Result<MoviePage, RemoteError>;

    /// Search movies by free text.
    async fn search_movies(&self, params: &SearchParams) -> Result<MoviePage, RemoteError>;
}
