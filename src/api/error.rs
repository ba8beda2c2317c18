//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::ApiAuthError;
use crate::error::AuthError;

/// Extension trait for concise error mapping on session results.
pub trait ResultExt<T> {
    /// Reject with the generic 401 body.
    fn unauthorized(self) -> Result<T, ApiError>;
    /// Reject with a message naming the failed check, clearing both cookies.
    fn rejected(self, secure_cookies: bool) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, AuthError> {
    fn unauthorized(self) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::Auth(ApiAuthError::generic(e)))
    }

    fn rejected(self, secure_cookies: bool) -> Result<T, ApiError> {
        self.map_err(|e| {
            ApiError::Auth(ApiAuthError::detailed(e).clearing_cookies(secure_cookies))
        })
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Auth(ApiAuthError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(e: ApiAuthError) -> Self {
        Self::Auth(e)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
            }
            ApiError::Auth(e) => e.into_response(),
        }
    }
}
