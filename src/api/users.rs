use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, ApiAuthError, Principal, REFRESH_COOKIE_NAME, clear_cookie, get_cookie,
    require_auth, token_cookie,
};
use crate::error::AuthError;
use crate::session::Session;
use crate::store::Identity;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/get-user", get(get_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<AppState>,
        ));

    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    identifier: Option<String>,
    username: Option<String>,
    email: Option<String>,
    password: String,
}

impl LoginRequest {
    /// First non-blank of identifier, username, email.
    fn identifier(&self) -> Option<&str> {
        [&self.identifier, &self.username, &self.email]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[derive(Deserialize, Default)]
struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    user: Identity,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
struct UserResponse {
    user: Identity,
}

/// Both token cookies plus the JSON body shared by login and refresh.
fn session_response(session: Session, secure: bool) -> impl IntoResponse {
    let access_cookie = token_cookie(
        ACCESS_COOKIE_NAME,
        &session.tokens.access.token,
        session.tokens.access.duration,
        secure,
    );
    let refresh_cookie = token_cookie(
        REFRESH_COOKIE_NAME,
        &session.tokens.refresh.token,
        session.tokens.refresh.duration,
        secure,
    );

    (
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(SessionResponse {
            user: session.identity,
            access_token: session.tokens.access.token,
            refresh_token: session.tokens.refresh.token,
        }),
    )
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = payload
        .identifier()
        .ok_or_else(|| ApiError::bad_request("Username or email is required"))?;

    let session = match state.sessions.login(identifier, &payload.password).await {
        Err(AuthError::MissingCredential) => {
            return Err(ApiError::bad_request("Username or email is required"));
        }
        result => result.map_err(ApiAuthError::detailed)?,
    };

    Ok(session_response(session, state.secure_cookies))
}

/// Exchange the refresh token (cookie, else JSON body) for a new pair.
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // The body is only consulted when there is no cookie
    let from_body = match get_cookie(&headers, REFRESH_COOKIE_NAME) {
        Some(_) => RefreshRequest::default(),
        None if body.is_empty() => RefreshRequest::default(),
        None => serde_json::from_slice::<RefreshRequest>(&body).map_err(|e| {
            warn!(error = %e, "Unreadable refresh request body");
            ApiError::bad_request("Invalid request body")
        })?,
    };

    let credential = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .or(from_body.refresh_token.as_deref().filter(|t| !t.is_empty()));

    let session = state
        .sessions
        .refresh(credential)
        .await
        .rejected(state.secure_cookies)?;

    Ok(session_response(session, state.secure_cookies))
}

async fn logout(
    State(state): State<AppState>,
    Principal(principal): Principal,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .logout(&principal.identity.id)
        .await
        .unauthorized()?;

    let secure = state.secure_cookies;
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(UserResponse {
            user: principal.identity,
        }),
    ))
}

async fn get_user(Principal(principal): Principal) -> Json<UserResponse> {
    Json(UserResponse {
        user: principal.identity,
    })
}
