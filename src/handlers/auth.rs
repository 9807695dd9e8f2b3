//! Authenticated caller
//!
//! Sessions are terminated by the gateway in front of this service, which
//! forwards the authenticated user's id in the `x-user-id` header.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use tracing::warn;

use crate::error::{ApiError, ErrorResponse};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|id| *id > 0);

        match id {
            Some(id) => Ok(AuthUser { id }),
            None => {
                warn!(path = %parts.uri.path(), "Missing or invalid user identity");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("Authentication required", "UNAUTHORIZED")),
                ))
            }
        }
    }
}
