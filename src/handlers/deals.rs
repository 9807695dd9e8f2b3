//! Deal handlers
//!
//! POST /deals, GET /deals, GET /deals/{id}, PATCH /deals/{id},
//! GET /deals/{id}/timeline

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
use crate::models::deal::{
    CreateDealRequest, DealDetailResponse, DealListResponse, DealResponse, TimelineResponse,
    UpdateDealRequest,
};
use crate::services::deal_store::DealStore;
use crate::AppState;

/// Open a deal on a published listing
///
/// POST /deals
///
/// ```json
/// { "listingId": 12, "offerAmount": 500000, "notes": "Interested in the SaaS" }
/// ```
///
/// Returns 201 with the deal in stage INQUIRY, or 409 with `existingDealId`
/// when the caller already has an open deal on the listing.
pub async fn create_deal(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateDealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DealResponse>), ApiError> {
    let payload = parse_body(payload)?;
    let correlation_id = uuid::Uuid::new_v4().to_string();
    info!(
        correlation_id = %correlation_id,
        buyer_id = user.id,
        listing_id = payload.listing_id,
        "Deal creation request received"
    );

    let deal = DealStore::new(&state.db, &state.notifier)
        .create_deal(user.id, payload)
        .await
        .map_err(map_pipeline_error)?;

    Ok((StatusCode::CREATED, Json(deal.into())))
}

/// GET /deals
pub async fn list_deals(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DealListResponse>, ApiError> {
    let deals = DealStore::new(&state.db, &state.notifier)
        .list_deals_for_user(user.id)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(DealListResponse {
        total: deals.len(),
        deals,
    }))
}

/// GET /deals/{id}
pub async fn get_deal(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<DealDetailResponse>, ApiError> {
    let deal_id = parse_path(path)?;
    let deal = DealStore::new(&state.db, &state.notifier)
        .get_deal(deal_id, user.id)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(deal))
}

/// Move a deal through the pipeline and/or change its offer or notes
///
/// PATCH /deals/{id}
///
/// ```json
/// { "stage": "OFFER", "offerAmount": 500000 }
/// ```
pub async fn update_deal(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateDealRequest>, JsonRejection>,
) -> Result<Json<DealResponse>, ApiError> {
    let deal_id = parse_path(path)?;
    let payload = parse_body(payload)?;
    let correlation_id = uuid::Uuid::new_v4().to_string();
    info!(
        correlation_id = %correlation_id,
        deal_id = deal_id,
        actor_id = user.id,
        stage = ?payload.stage,
        offer_amount = ?payload.offer_amount,
        "Deal update request received"
    );

    let deal = DealStore::new(&state.db, &state.notifier)
        .update_stage(deal_id, user.id, payload)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(deal.into()))
}

/// GET /deals/{id}/timeline
pub async fn get_deal_timeline(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let deal_id = parse_path(path)?;
    let events = DealStore::new(&state.db, &state.notifier)
        .get_timeline(deal_id, user.id)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(TimelineResponse { events }))
}
