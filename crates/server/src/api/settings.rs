//! Move settings API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};
use movetools_core::{MoveSettings, SettingsError, SettingsUpdate};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<MoveSettings> {
    Json(state.service().settings().await)
}

/// PUT /api/v1/settings
///
/// Apply a partial update. Groups and fields left out keep their value.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<MoveSettings>, (StatusCode, Json<ErrorResponse>)> {
    match state.service().update_settings(&update).await {
        Ok(settings) => {
            info!("Settings updated: {:?}", settings);
            Ok(Json(settings))
        }
        Err(e @ SettingsError::Invalid(_)) => {
            Err((StatusCode::BAD_REQUEST, ErrorResponse::new(e.to_string())))
        }
        Err(e) => {
            error!("Failed to persist settings: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()),
            ))
        }
    }
}
