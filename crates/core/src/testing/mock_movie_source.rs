//! Mock movie source for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::movie::{MovieDto, MoviePage};
use crate::remote::{MovieSource, RemoteError, SearchParams};

use super::fixtures;

/// A recorded source call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSourceCall {
    Trending { language: String },
    Search(SearchParams),
}

/// Mock implementation of the MovieSource trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable trending and search results
/// - Track calls for assertions
/// - Simulate one-off or persistent failures
/// - Delay individual searches to force out-of-order completion
///
/// Searches match the configured catalog by case-insensitive title
/// substring and keep catalog order.
#[derive(Debug, Default)]
pub struct MockMovieSource {
    trending: Arc<RwLock<Vec<MovieDto>>>,
    catalog: Arc<RwLock<Vec<MovieDto>>>,
    calls: Arc<RwLock<Vec<RecordedSourceCall>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<RemoteError>>>,
    /// If set, every operation fails with an API error of this status.
    failing_status: Arc<RwLock<Option<u16>>>,
    search_delays: Arc<RwLock<HashMap<String, Duration>>>,
}

impl MockMovieSource {
    /// Create a new empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Set the trending list, in remote order.
    pub async fn set_trending(&self, movies: Vec<MovieDto>) {
        *self.trending.write().await = movies;
    }

    /// Set the searchable catalog, in remote order.
    pub async fn set_catalog(&self, movies: Vec<MovieDto>) {
        *self.catalog.write().await = movies;
    }

    // =========================================================================
    // Call recording
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedSourceCall> {
        self.calls.read().await.clone()
    }

    /// Get the number of calls performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Queries of the recorded searches, in call order.
    pub async fn searched_queries(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedSourceCall::Search(params) => Some(params.query.clone()),
                RecordedSourceCall::Trending { .. } => None,
            })
            .collect()
    }

    // =========================================================================
    // Error injection and timing
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: RemoteError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every operation fail with an API error of `status`, or stop
    /// failing with `None`.
    pub async fn set_failing(&self, status: Option<u16>) {
        *self.failing_status.write().await = status;
    }

    /// Delay searches for exactly `query`.
    pub async fn set_search_delay(&self, query: &str, delay: Duration) {
        self.search_delays
            .write()
            .await
            .insert(query.to_string(), delay);
    }

    async fn take_error(&self) -> Option<RemoteError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Some(err);
        }
        self.failing_status
            .read()
            .await
            .map(|status| RemoteError::ApiError {
                status,
                message: "mock failure".to_string(),
            })
    }

    async fn record(&self, call: RecordedSourceCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl MovieSource for MockMovieSource {
    async fn fetch_trending(&self, language: &str) -> Result<MoviePage, RemoteError> {
        self.record(RecordedSourceCall::Trending {
            language: language.to_string(),
        })
        .await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        Ok(fixtures::page(self.trending.read().await.clone()))
    }

    async fn search_movies(&self, params: &SearchParams) -> Result<MoviePage, RemoteError> {
        self.record(RecordedSourceCall::Search(params.clone())).await;

        let delay = self.search_delays.read().await.get(&params.query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let needle = params.query.to_lowercase();
        let results = self
            .catalog
            .read()
            .await
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        Ok(fixtures::page(results))
    }
}
