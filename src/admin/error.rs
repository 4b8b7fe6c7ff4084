//! Admin API Error Types
//!
//! The HTTP-facing error taxonomy. Each variant maps to one status code and
//! a JSON body; validation and apply failures use the `{ok: false, error}`
//! shape the UI expects from mutating endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::netplan::{ApplyError, ValidationError};
use crate::system::CommandError;

/// Result type for admin API operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Admin API error types
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Missing or invalid token, or no valid session
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests. Try again later.")]
    RateLimited,

    /// The token file is absent or empty
    #[error("Admin token not configured on this device")]
    TokenNotConfigured,

    #[error("{0}")]
    BadRequest(String),

    /// Body exceeded the configured size cap
    #[error("Request body too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Not found")]
    NotFound,
}

/// Error body for read endpoints and auth failures
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error body for mutating endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub ok: bool,
    pub error: String,
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AdminError::BadRequest(_) | AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AdminError::NotFound => StatusCode::NOT_FOUND,
            AdminError::TokenNotConfigured
            | AdminError::Apply(_)
            | AdminError::Command(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        match self {
            AdminError::Validation(_) | AdminError::Apply(_) => {
                (status, Json(FailureResponse { ok: false, error })).into_response()
            }
            _ => (status, Json(ErrorResponse { error })).into_response(),
        }
    }
}
