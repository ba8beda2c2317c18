//! Error taxonomy for the session core.

use crate::jwt::TokenError;
use crate::store::StoreError;

/// Why an authentication operation was rejected.
#[derive(Debug)]
pub enum AuthError {
    /// No credential was presented
    MissingCredential,
    /// The credential is not a token at all
    Malformed,
    /// Tampered or foreign signature
    InvalidSignature,
    /// Signature is fine but the token expired
    Expired,
    /// Access token used as refresh token, or vice versa
    ClassMismatch,
    /// The token's subject no longer exists
    SubjectNotFound,
    /// Refresh token is not the one currently stored (rotated away or logged out)
    StaleToken,
    /// Unknown identifier or wrong password at login
    InvalidCredentials,
    /// The credential store failed; nothing was issued
    PersistenceFailure(StoreError),
    /// Tokens could not be minted
    TokenIssue(TokenError),
}

impl AuthError {
    /// Client-caused rejections. Everything else is a server fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::PersistenceFailure(_) | AuthError::TokenIssue(_)
        )
    }

    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::Malformed => "malformed",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::ClassMismatch => "class_mismatch",
            AuthError::SubjectNotFound => "subject_not_found",
            AuthError::StaleToken => "stale_token",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::PersistenceFailure(_) => "persistence_failure",
            AuthError::TokenIssue(_) => "token_issue",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Credential must be provided"),
            AuthError::Malformed => write!(f, "Malformed token"),
            AuthError::InvalidSignature => write!(f, "Invalid token"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::ClassMismatch => write!(f, "Wrong token type"),
            AuthError::SubjectNotFound => write!(f, "Invalid token subject"),
            AuthError::StaleToken => write!(f, "Token expired or already used"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::PersistenceFailure(e) => write!(f, "Credential store failure: {}", e),
            AuthError::TokenIssue(e) => write!(f, "Token issue failure: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::PersistenceFailure(e) => Some(e),
            AuthError::TokenIssue(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed => AuthError::Malformed,
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::Expired,
            TokenError::ClassMismatch => AuthError::ClassMismatch,
            TokenError::Encoding(_) | TokenError::Clock => AuthError::TokenIssue(e),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::PersistenceFailure(e)
    }
}
