//! Scheduled call handlers
//!
//! POST /calls, GET /calls, PATCH /calls/{id}

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::{map_pipeline_error, parse_body, parse_path, ApiError};
use crate::handlers::auth::AuthUser;
use crate::models::call::{CallListResponse, CallResponse, CreateCallRequest, UpdateCallRequest};
use crate::services::calls::CallService;
use crate::AppState;

/// POST /calls
///
/// ```json
/// { "receiverId": 7, "scheduledAt": "2026-11-02T15:00:00Z", "durationMinutes": 45, "dealId": 3 }
/// ```
pub async fn create_call(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateCallRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CallResponse>), ApiError> {
    let payload = parse_body(payload)?;
    info!(
        scheduler_id = user.id,
        receiver_id = payload.receiver_id,
        deal_id = ?payload.deal_id,
        "Call scheduling request received"
    );

    let call = CallService::new(&state.db, &state.notifier)
        .create(user.id, payload)
        .await
        .map_err(map_pipeline_error)?;

    Ok((StatusCode::CREATED, Json(call.into())))
}

/// GET /calls
pub async fn list_calls(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CallListResponse>, ApiError> {
    let calls = CallService::new(&state.db, &state.notifier)
        .list_for_user(user.id)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(CallListResponse {
        calls: calls.into_iter().map(Into::into).collect(),
    }))
}

/// PATCH /calls/{id}
pub async fn update_call(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateCallRequest>, JsonRejection>,
) -> Result<Json<CallResponse>, ApiError> {
    let call_id = parse_path(path)?;
    let payload = parse_body(payload)?;

    let call = CallService::new(&state.db, &state.notifier)
        .update_status(call_id, user.id, payload)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(call.into()))
}
