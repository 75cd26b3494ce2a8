use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// AuthError
///
/// Every way a bearer token can fail verification. All variants surface as
/// 401 to the caller; the variant itself is only used for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header not found")]
    MissingHeader,
    #[error("Authorization header must be of the form 'Bearer <token>'")]
    MalformedHeader,
    #[error("Token header carries no key id")]
    InvalidHeader,
    #[error("Unable to find the appropriate signing key")]
    KeyNotFound,
    #[error("Token expired")]
    TokenExpired,
    #[error("Incorrect claims, check the audience and issuer")]
    InvalidClaims,
    #[error("Unable to parse authentication token")]
    MalformedToken,
    #[error("Signing key set could not be retrieved")]
    KeySetUnavailable,
}

/// ApiError
///
/// The categorized failure every handler and middleware returns. The
/// `IntoResponse` impl renders the shared failure envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Token was valid but lacks the permission the route requires.
    #[error("Permission '{0}' not granted")]
    Unauthorized(String),
    #[error("Resource Not Found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Repository(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorResponse
///
/// Failure envelope: `{ "success": false, "error": <status>, "message": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Auth(e) => {
                tracing::warn!("authentication rejected: {}", e);
                e.to_string()
            }
            ApiError::Unauthorized(permission) => {
                tracing::warn!("permission '{}' missing from token", permission);
                self.to_string()
            }
            // Persistence detail stays in the logs.
            ApiError::Repository(e) => {
                tracing::error!("repository error: {:?}", e);
                "Unprocessable Request".to_string()
            }
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
