//! Search history API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cinecache_core::SearchRecord;
use serde::{Deserialize, Serialize};

use super::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SaveSearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub entries: Vec<SearchRecord>,
    pub total: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal(e: impl ToString) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/history
///
/// Recent searches, most recent first.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryListResponse>, ApiError> {
    let history = state.history();
    let limit = params.limit.unwrap_or(history.max_items());

    let entries = history.get_recent(limit).map_err(internal)?;
    let total = entries.len();
    Ok(Json(HistoryListResponse { entries, total }))
}

/// POST /api/v1/history
pub async fn save_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveSearchRequest>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    if request.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query cannot be blank".to_string(),
            }),
        ));
    }

    state
        .history()
        .save_search(&request.query)
        .map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            message: format!("Saved search: {}", request.query.trim()),
        }),
    ))
}

/// DELETE /api/v1/history/{query}
///
/// Deleting an unknown query succeeds.
pub async fn delete_search(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.history().delete_search(&query).map_err(internal)?;
    Ok(Json(SuccessResponse {
        message: format!("Deleted search: {}", query),
    }))
}

/// DELETE /api/v1/history
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.history().clear_history().map_err(internal)?;
    Ok(Json(SuccessResponse {
        message: "History cleared".to_string(),
    }))
}
