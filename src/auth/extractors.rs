//! Request verification middleware and the principal extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::cookie::access_credential;
use super::errors::ApiAuthError;
use super::state::HasSessionBackend;
use super::types::AuthenticatedPrincipal;
use crate::error::AuthError;

/// Middleware for protected routes.
///
/// Verifies the access token (cookie, else bearer header), resolves the
/// subject, and stores the `AuthenticatedPrincipal` in the request extensions
/// before the handler runs. Nothing persisted is modified.
pub async fn require_auth<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiAuthError>
where
    S: HasSessionBackend + Clone + Send + Sync + 'static,
{
    let credential = access_credential(request.headers()).map(str::to_owned);

    let principal = state
        .sessions()
        .verify_request(credential.as_deref())
        .await
        .map_err(ApiAuthError::generic)?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extractor for the principal attached by `require_auth`.
/// Rejects with 401 when used on a route without the middleware.
pub struct Principal(pub AuthenticatedPrincipal);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .map(Principal)
            .ok_or_else(|| ApiAuthError::generic(AuthError::MissingCredential))
    }
}
