//! Error taxonomy for the deal pipeline and its HTTP mapping
//!
//! Services return `PipelineError`; handlers turn it into the
//! `(StatusCode, Json<ErrorResponse>)` pair with `map_pipeline_error`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::StatusCode,
    Json,
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug)]
pub enum PipelineError {
    /// Deal, listing, call or user does not exist
    NotFound(String),
    /// Caller is not a participant, or is trying to deal with themselves
    Forbidden(String),
    /// Requested stage/status is not a successor of the current one
    InvalidTransition { message: String, allowed: Vec<String> },
    /// Entity is in a state that does not accept the operation
    InvalidState(String),
    /// Duplicate open deal or lost optimistic-lock race
    Conflict {
        message: String,
        existing_deal_id: Option<i32>,
    },
    /// Malformed request payload
    Validation(String),
    Database(DbErr),
}

impl PipelineError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Forbidden(_) => "FORBIDDEN",
            PipelineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            PipelineError::InvalidState(_) => "INVALID_STATE",
            PipelineError::Conflict { .. } => "CONFLICT",
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Forbidden(_) => StatusCode::FORBIDDEN,
            PipelineError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::InvalidState(_) => StatusCode::CONFLICT,
            PipelineError::Conflict { .. } => StatusCode::CONFLICT,
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::NotFound(msg) => write!(f, "Not found: {}", msg),
            PipelineError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            PipelineError::InvalidTransition { message, .. } => {
                write!(f, "Invalid transition: {}", message)
            }
            PipelineError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            PipelineError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            PipelineError::Validation(msg) => write!(f, "Validation error: {}", msg),
            PipelineError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for PipelineError {
    fn from(e: DbErr) -> Self {
        PipelineError::Database(e)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Error code for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Allowed successor stages/statuses on INVALID_TRANSITION
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    /// Id of the already-open deal on CONFLICT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_deal_id: Option<i32>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
            allowed: None,
            existing_deal_id: None,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a pipeline error to its HTTP response. Database details are logged, never returned.
pub fn map_pipeline_error(err: PipelineError) -> ApiError {
    let status = err.status();
    let code = err.code();
    let body = match err {
        PipelineError::Database(e) => {
            error!(error = %e, "Database error while processing request");
            ErrorResponse::new("Internal server error", code)
        }
        PipelineError::InvalidTransition { message, allowed } => ErrorResponse {
            allowed: Some(allowed),
            ..ErrorResponse::new(message, code)
        },
        PipelineError::Conflict {
            message,
            existing_deal_id,
        } => ErrorResponse {
            existing_deal_id,
            ..ErrorResponse::new(message, code)
        },
        PipelineError::NotFound(msg)
        | PipelineError::Forbidden(msg)
        | PipelineError::InvalidState(msg)
        | PipelineError::Validation(msg) => ErrorResponse::new(msg, code),
    };

    (status, Json(body))
}

/// Unwrap a path id, reporting ids that do not parse as VALIDATION_ERROR
pub fn parse_path<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    match path {
        Ok(Path(value)) => Ok(value),
        Err(rejection) => {
            let message = rejection.body_text();
            warn!(error = %message, "Rejected path parameter");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(message, "VALIDATION_ERROR")),
            ))
        }
    }
}

/// Unwrap a JSON body, reporting malformed or unknown fields as VALIDATION_ERROR
pub fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let message = rejection.body_text();
            warn!(error = %message, "Rejected request body");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(message, "VALIDATION_ERROR")),
            ))
        }
    }
}
