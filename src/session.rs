//! Login, request verification, refresh-token rotation and logout.
//!
//! Rotation is single-use: each refresh token can be exchanged exactly once.
//! The exchange swaps the stored value only if it still equals the presented
//! token, so a replayed or concurrently used token loses with `StaleToken`.

use tracing::{info, warn};

use crate::auth::AuthenticatedPrincipal;
use crate::error::AuthError;
use crate::jwt::{TokenClass, TokenPair, TokenService};
use crate::store::{CredentialStore, Identity};

/// A freshly issued token pair and the identity it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub tokens: TokenPair,
}

/// The session core, generic over the credential store backend.
#[derive(Clone)]
pub struct SessionService<S> {
    tokens: TokenService,
    store: S,
}

impl<S: CredentialStore> SessionService<S> {
    pub fn new(tokens: TokenService, store: S) -> Self {
        Self { tokens, store }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Authenticate with a username or email and a password.
    /// Replaces whatever refresh token the user had before.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let Some(user) = self.store.find_by_identifier(identifier).await? else {
            self.store.verify_unknown(password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.store.verify_password(&user, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.mint_pair(&user.identity)?;
        self.store
            .persist_refresh_token(&user.identity.id, &tokens.refresh.token)
            .await?;

        info!(user = %user.identity.id, "Logged in");

        Ok(Session {
            identity: user.identity,
            tokens,
        })
    }

    /// Resolve an access token to the principal it was issued for.
    /// Never touches persisted state beyond reading the user record.
    pub async fn verify_request(
        &self,
        credential: Option<&str>,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        let token = credential.ok_or(AuthError::MissingCredential)?;
        let claims = self.tokens.verify(token, TokenClass::Access)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;

        Ok(AuthenticatedPrincipal {
            identity: user.identity,
            claims,
        })
    }

    /// Exchange a live refresh token for a new pair.
    pub async fn refresh(&self, credential: Option<&str>) -> Result<Session, AuthError> {
        let presented = credential.ok_or(AuthError::MissingCredential)?;
        let claims = self.tokens.verify(presented, TokenClass::Refresh)?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::SubjectNotFound)?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!(user = %user.identity.id, "Refresh token reuse or revoked token presented");
            return Err(AuthError::StaleToken);
        }

        let tokens = self.tokens.mint_pair(&user.identity)?;

        // Lost the race to another rotation or a logout since the read above
        let rotated = self
            .store
            .rotate_refresh_token(&user.identity.id, presented, &tokens.refresh.token)
            .await?;
        if !rotated {
            warn!(user = %user.identity.id, "Refresh token rotated concurrently");
            return Err(AuthError::StaleToken);
        }

        info!(user = %user.identity.id, "Rotated refresh token");

        Ok(Session {
            identity: user.identity,
            tokens,
        })
    }

    /// Revoke the user's refresh token. Returns false if none was stored.
    pub async fn logout(&self, id: &str) -> Result<bool, AuthError> {
        let cleared = self.store.clear_refresh_token(id).await?;
        info!(user = %id, cleared, "Logged out");
        Ok(cleared)
    }
}
