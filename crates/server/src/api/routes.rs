use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, history, middleware::metrics_middleware, movies, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Movies
        .route("/movies/trending", get(movies::trending))
        .route("/movies/search", get(movies::search))
        .route("/movies", delete(movies::clear_cache))
        .route("/movies/{id}", get(movies::get_movie))
        // Search history
        .route(
            "/history",
            get(history::list_history)
                .post(history::save_search)
                .delete(history::clear_history),
        )
        .route("/history/{query}", delete(history::delete_search))
        // Live query sessions
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
