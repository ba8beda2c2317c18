//! Authentication principal types.

use crate::jwt::TokenClaims;
use crate::store::Identity;

/// The identity a verified access token resolved to.
/// Lives in the request extensions for the rest of the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub identity: Identity,
    /// Claims from the access token
    pub claims: TokenClaims,
}
