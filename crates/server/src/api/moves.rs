//! Move job API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use movetools_core::{
    CompletedMove, JobKey, JobSnapshot, ServiceStatus, SubmitOutcome, SubmitRequest,
};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<JobKey>,
}

#[derive(Debug, Serialize)]
pub struct MoveListResponse {
    pub moves: Vec<JobSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitMoveResponse {
    pub accepted: bool,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct CompletedResponse {
    pub results: Vec<CompletedMove>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: Vec<JobKey>,
    pub count: usize,
}

impl From<Vec<JobKey>> for RemovedResponse {
    fn from(removed: Vec<JobKey>) -> Self {
        let count = removed.len();
        Self { removed, count }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/moves
///
/// All kept job records, oldest first.
pub async fn list_moves(State(state): State<Arc<AppState>>) -> Json<MoveListResponse> {
    let moves = state.service().jobs().await;
    let count = moves.len();
    Json(MoveListResponse { moves, count })
}

/// GET /api/v1/moves/{key}
pub async fn get_move(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state.service().job(&key).await.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("No move job for {}", key)),
        )
    })
}

/// GET /api/v1/moves/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    Json(state.service().status().await)
}

/// POST /api/v1/moves
///
/// Submit a move. 202 when queued, 409 when a queued or moving job with the
/// same key exists, 422 when the job was recorded as failed right away.
pub async fn submit_move(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitMoveResponse>), ApiError> {
    if request.key.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("key must not be empty"),
        ));
    }

    let key = request.key.clone();
    let outcome = state.service().submit(request).await;
    let status = match &outcome {
        SubmitOutcome::Queued => StatusCode::ACCEPTED,
        SubmitOutcome::Duplicate => StatusCode::CONFLICT,
        SubmitOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    info!("Move of {} submitted: {:?}", key, outcome);

    let job = state.service().job(&key).await;
    Ok((
        status,
        Json(SubmitMoveResponse {
            accepted: outcome.is_accepted(),
            outcome,
            job,
        }),
    ))
}

/// POST /api/v1/moves/completed
///
/// Move finished torrents to their completed-move destination.
pub async fn move_completed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeysRequest>,
) -> Json<CompletedResponse> {
    let results = state.service().move_completed(&request.keys).await;
    Json(CompletedResponse { results })
}

/// POST /api/v1/moves/cancel
///
/// Drop queued jobs. Moving and finished jobs are left alone.
pub async fn cancel_moves(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeysRequest>,
) -> Json<RemovedResponse> {
    let removed = state.service().cancel_pending(&request.keys).await;
    if !removed.is_empty() {
        info!("Cancelled {} queued move(s)", removed.len());
    }
    Json(removed.into())
}

/// POST /api/v1/moves/clear
pub async fn clear_moves(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeysRequest>,
) -> Json<RemovedResponse> {
    Json(state.service().clear_finished(&request.keys).await.into())
}

/// DELETE /api/v1/moves
///
/// Clear every finished record.
pub async fn clear_all(State(state): State<Arc<AppState>>) -> Json<RemovedResponse> {
    Json(state.service().clear_all().await.into())
}
