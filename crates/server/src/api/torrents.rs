//! Known torrent API handlers.
//!
//! The registry is what "move completed" consults for a torrent's save path,
//! files and completed-move destination.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use movetools_core::TorrentSnapshot;

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TorrentListResponse {
    pub torrents: Vec<TorrentSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// GET /api/v1/torrents
pub async fn list_torrents(State(state): State<Arc<AppState>>) -> Json<TorrentListResponse> {
    let torrents = state.registry().list();
    let count = torrents.len();
    Json(TorrentListResponse { torrents, count })
}

/// POST /api/v1/torrents
///
/// Register a torrent, replacing any snapshot with the same key.
/// 201 when new, 200 when replaced.
pub async fn register_torrent(
    State(state): State<Arc<AppState>>,
    Json(torrent): Json<TorrentSnapshot>,
) -> Result<(StatusCode, Json<TorrentSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    if torrent.key.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("key must not be empty"),
        ));
    }

    let status = match state.registry().register(torrent.clone()) {
        Some(_) => StatusCode::OK,
        None => {
            info!("Registered torrent {}", torrent.key);
            StatusCode::CREATED
        }
    };
    Ok((status, Json(torrent)))
}

/// DELETE /api/v1/torrents/{key}
pub async fn remove_torrent(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.registry().remove(&key) {
        Some(_) => Ok(Json(SuccessResponse {
            message: format!("Torrent {} removed", key),
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Unknown torrent {}", key)),
        )),
    }
}
