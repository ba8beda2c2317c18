//! Credential store interface used by the session core.
//!
//! The store holds one record per identity: a password hash and at most one
//! live refresh token. Overwriting the refresh token is how older tokens get
//! revoked, so there is no separate revocation list.

use std::future::Future;

use serde::Serialize;

/// Public identity of a user. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Opaque subject id (UUID)
    pub id: String,
    pub username: String,
    pub email: String,
}

/// A user record as persisted by the credential store.
#[derive(Clone)]
pub struct StoredUser {
    pub identity: Identity,
    /// PHC-formatted password hash
    pub password_hash: String,
    /// The single refresh token currently allowed to rotate, if any
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredUser")
            .field("identity", &self.identity)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors raised by a credential store backend.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying database failed
    Database(sqlx::Error),
    /// Password hashing or verification could not run
    Password(String),
    /// A write targeted a user record that no longer exists
    MissingRecord(String),
    /// Rejected account data
    InvalidInput(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Password(msg) => write!(f, "Password error: {}", msg),
            StoreError::MissingRecord(id) => write!(f, "No user record for {}", id),
            StoreError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::Password(_)
            | StoreError::MissingRecord(_)
            | StoreError::InvalidInput(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Persistence operations the session core needs from the surrounding application.
///
/// `rotate_refresh_token` must compare and replace in one atomic step: of two
/// callers presenting the same `current` value, at most one may see `true`.
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Look up a user by username or email.
    fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, StoreError>> + Send;

    /// Look up a user by subject id.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, StoreError>> + Send;

    /// Check a plaintext password against the user's stored hash.
    fn verify_password(
        &self,
        user: &StoredUser,
        password: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Spend the same work as `verify_password` for an identifier that
    /// matched no user. Always treated as a failed login.
    fn verify_unknown(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Unconditionally replace the stored refresh token (login).
    fn persist_refresh_token(
        &self,
        id: &str,
        token: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the stored refresh token only if it still equals `current`.
    /// Returns false when the stored value had already changed.
    fn rotate_refresh_token(
        &self,
        id: &str,
        current: &str,
        new: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Remove the stored refresh token (logout). Returns true if one was set.
    fn clear_refresh_token(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
