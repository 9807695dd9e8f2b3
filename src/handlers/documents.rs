use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::error::{map_pipeline_error, parse_body, parse_path, ApiError};
use crate::handlers::auth::AuthUser;
use crate::models::document::{AddDocumentRequest, DocumentListResponse, DocumentResponse};
use crate::services::documents::DocumentService;
use crate::AppState;

/// GET /deals/{id}/documents
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let deal_id = parse_path(path)?;
    let documents = DocumentService::new(&state.db, &state.notifier)
        .list(deal_id, user.id)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(DocumentListResponse {
        documents: documents.into_iter().map(Into::into).collect(),
    }))
}

/// POST /deals/{id}/documents
pub async fn add_document(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<AddDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let deal_id = parse_path(path)?;
    let payload = parse_body(payload)?;

    let document = DocumentService::new(&state.db, &state.notifier)
        .add(deal_id, user.id, payload)
        .await
        .map_err(map_pipeline_error)?;

    Ok((StatusCode::CREATED, Json(document.into())))
}
