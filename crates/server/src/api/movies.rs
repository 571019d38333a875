//! Movie API handlers.
//!
//! Trending and search run one reconciliation and answer with every
//! envelope it produced, in order.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cinecache_core::movie::{IMAGE_SIZE_ORIGINAL, IMAGE_SIZE_W500};
use cinecache_core::{Movie, MovieStream, Resource};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// A movie with display helpers resolved.
#[derive(Debug, Serialize)]
pub struct MovieResponse {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<String>,
    pub rating: String,
}

impl MovieResponse {
    fn new(movie: Movie, image_base_url: &str) -> Self {
        Self {
            poster_url: movie.poster_url(image_base_url, IMAGE_SIZE_W500),
            backdrop_url: movie.backdrop_url(image_base_url, IMAGE_SIZE_ORIGINAL),
            release_year: movie.release_year().map(str::to_string),
            rating: movie.formatted_rating(),
            movie,
        }
    }
}

pub type Envelopes = Vec<Resource<Vec<MovieResponse>>>;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/movies/trending
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingParams>,
) -> Json<Envelopes> {
    let stream = state.repository().fetch_trending(params.force_refresh);
    Json(collect(stream, state.image_base_url()).await)
}

/// GET /api/v1/movies/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Envelopes> {
    let stream = state.repository().search(&params.query);
    Json(collect(stream, state.image_base_url()).await)
}

/// GET /api/v1/movies/{id}
///
/// Cached movies only.
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MovieResponse>, ApiError> {
    match state.repository().get_by_id(id) {
        Ok(Some(movie)) => Ok(Json(MovieResponse::new(movie, state.image_base_url()))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Movie not found: {}", id),
            }),
        )),
        Err(e) => {
            error!("Failed to read movie {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// DELETE /api/v1/movies
///
/// Drop every cached movie.
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.repository().clear_cache().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(SuccessResponse {
        message: "Cache cleared".to_string(),
    }))
}

async fn collect(stream: MovieStream, image_base_url: &str) -> Envelopes {
    stream
        .map(|resource| {
            resource.map(|movies| {
                movies
                    .into_iter()
                    .map(|movie| MovieResponse::new(movie, image_base_url))
                    .collect()
            })
        })
        .collect()
        .await
}
