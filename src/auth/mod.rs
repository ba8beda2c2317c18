//! Access-token verification for protected routes.
//!
//! Access tokens arrive in the `access_token` cookie or an
//! `Authorization: Bearer` header. Verification is stateless apart from
//! resolving the subject to a current user record.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, access_credential, clear_cookie, get_bearer_token,
    get_cookie, token_cookie,
};
pub use errors::ApiAuthError;
pub use extractors::{Principal, require_auth};
pub use state::HasSessionBackend;
pub use types::AuthenticatedPrincipal;
