use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, moves, settings, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Move jobs
        .route("/moves", get(moves::list_moves))
        .route("/moves", post(moves::submit_move))
        .route("/moves", delete(moves::clear_all))
        .route("/moves/status", get(moves::get_status))
        .route("/moves/completed", post(moves::move_completed))
        .route("/moves/cancel", post(moves::cancel_moves))
        .route("/moves/clear", post(moves::clear_moves))
        .route("/moves/{key}", get(moves::get_move))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
        // Known torrents
        .route("/torrents", get(torrents::list_torrents))
        .route("/torrents", post(torrents::register_torrent))
        .route("/torrents/{key}", delete(torrents::remove_torrent))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
