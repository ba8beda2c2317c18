//! Authentication error responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie};
use crate::error::AuthError;

/// Authentication rejection as sent to the client (JSON body).
///
/// Protected routes answer every client-caused failure with the same generic
/// message; the specific reason is only logged. The refresh endpoint may
/// expose the reason.
#[derive(Debug)]
pub struct ApiAuthError {
    error: AuthError,
    expose_reason: bool,
    clear_cookies: Option<bool>,
}

impl ApiAuthError {
    /// A rejection that hides which check failed.
    pub fn generic(error: AuthError) -> Self {
        log_rejection(&error);
        Self {
            error,
            expose_reason: false,
            clear_cookies: None,
        }
    }

    /// A rejection whose message names the failed check.
    pub fn detailed(error: AuthError) -> Self {
        Self {
            expose_reason: true,
            ..Self::generic(error)
        }
    }

    /// Also clear both token cookies in the response.
    pub fn clearing_cookies(mut self, secure: bool) -> Self {
        self.clear_cookies = Some(secure);
        self
    }

    fn status_code(&self) -> StatusCode {
        if self.error.is_client_error() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn message(&self) -> String {
        match (self.error.is_client_error(), self.expose_reason) {
            (true, true) => self.error.to_string(),
            (true, false) => "Unauthorized".to_string(),
            (false, _) => "Internal server error".to_string(),
        }
    }
}

fn log_rejection(error: &AuthError) {
    if error.is_client_error() {
        tracing::debug!(reason = error.kind(), "Rejected credential");
    } else {
        tracing::error!(reason = error.kind(), error = %error, "Authentication failed");
    }
}

impl From<AuthError> for ApiAuthError {
    fn from(error: AuthError) -> Self {
        Self::generic(error)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        if let Some(secure) = self.clear_cookies {
            let headers = response.headers_mut();
            for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
                if let Ok(value) = HeaderValue::from_str(&clear_cookie(name, secure)) {
                    headers.append(header::SET_COOKIE, value);
                }
            }
        }

        response
    }
}
