//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MovieSource, RemoteError, SearchParams};
use crate::movie::MoviePage;

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Image base URL for posters/backdrops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Response language (default: en-US).
    #[serde(default = "default_language")]
    pub language: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl TmdbConfig {
    /// Config with only an API key; everything else defaulted.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            image_base_url: None,
            language: default_language(),
            timeout_secs: default_timeout(),
        }
    }
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, RemoteError> {
        if config.api_key.is_empty() {
            return Err(RemoteError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Map status codes to errors and decode the listing body.
    async fn read_page(response: Response, what: &str) -> Result<MoviePage, RemoteError> {
        let status = response.status();
        if status == 401 {
            return Err(RemoteError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(RemoteError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            RemoteError::ParseError(format!("Failed to parse {} response: {}", what, e))
        })
    }
}

#[async_trait]
impl MovieSource for TmdbClient {
    async fn fetch_trending(&self, language: &str) -> Result<MoviePage, RemoteError> {
        let url = format!("{}/trending/movie/week", self.base_url);

        debug!("TMDB trending: language={}", language);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", language)])
            .send()
            .await?;

        Self::read_page(response, "trending").await
    }

    async fn search_movies(&self, params: &SearchParams) -> Result<MoviePage, RemoteError> {
        let url = format!("{}/search/movie", self.base_url);

        debug!(
            "TMDB movie search: query='{}', page={}",
            params.query, params.page
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", params.query.as_str()),
                ("language", params.language.as_str()),
            ])
            .query(&[("page", params.page)])
            .query(&[("include_adult", params.include_adult)])
            .send()
            .await?;

        Self::read_page(response, "movie search").await
    }
}
