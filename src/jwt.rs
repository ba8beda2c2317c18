//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with different secrets, so a token of
//! one class can never pass as the other. Verification is pure: it proves a
//! token was minted here and has not expired, nothing more. Whether a refresh
//! token is still the live one is decided against the credential store.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::Identity;

/// Default access token lifetime: 5 minutes
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 5 * 60;

/// Default refresh token lifetime: 2 weeks
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Longest lifetime accepted for either class: 1 year
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Token class for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    fn other(self) -> Self {
        match self {
            TokenClass::Access => TokenClass::Refresh,
            TokenClass::Refresh => TokenClass::Access,
        }
    }
}

impl std::fmt::Display for TokenClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenClass::Access => write!(f, "access"),
            TokenClass::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims shared by both token classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (identity id)
    pub sub: String,
    /// Token class
    #[serde(rename = "typ")]
    pub class: TokenClass,
    /// JWT ID, makes every minted token unique
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signing secrets and lifetimes. Built once at startup.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: u64,
    pub refresh_ttl: u64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Access and refresh token issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: MintedToken,
    pub refresh: MintedToken,
}

struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: u64,
}

/// Mints and verifies signed, expiring tokens. Holds no mutable state.
#[derive(Clone)]
pub struct TokenService {
    access: Arc<ClassKeys>,
    refresh: Arc<ClassKeys>,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: Arc::new(ClassKeys {
                encoding: EncodingKey::from_secret(&config.access_secret),
                decoding: DecodingKey::from_secret(&config.access_secret),
                ttl: config.access_ttl,
            }),
            refresh: Arc::new(ClassKeys {
                encoding: EncodingKey::from_secret(&config.refresh_secret),
                decoding: DecodingKey::from_secret(&config.refresh_secret),
                ttl: config.refresh_ttl,
            }),
        }
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Generate a short-lived access token for an identity.
    pub fn mint_access_token(&self, identity: &Identity) -> Result<MintedToken, TokenError> {
        self.mint_at(identity, TokenClass::Access, now()?)
    }

    /// Generate a long-lived refresh token for an identity.
    pub fn mint_refresh_token(&self, identity: &Identity) -> Result<MintedToken, TokenError> {
        self.mint_at(identity, TokenClass::Refresh, now()?)
    }

    /// Generate an access and refresh token in one go.
    pub fn mint_pair(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.mint_access_token(identity)?,
            refresh: self.mint_refresh_token(identity)?,
        })
    }

    /// Mint a token as if issued at `issued_at` (Unix seconds).
    pub(crate) fn mint_at(
        &self,
        identity: &Identity,
        class: TokenClass,
        issued_at: u64,
    ) -> Result<MintedToken, TokenError> {
        let keys = self.keys(class);
        let exp = issued_at.checked_add(keys.ttl).ok_or(TokenError::Clock)?;

        let claims = TokenClaims {
            sub: identity.id.clone(),
            class,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
            .map_err(TokenError::Encoding)?;

        Ok(MintedToken {
            token,
            expires_at: exp,
            duration: keys.ttl,
        })
    }

    /// Validate a token and return its claims.
    ///
    /// Checks run in order: structure, signature, expiry, class. A token that
    /// only verifies under the other class's secret is a class mismatch.
    pub fn verify(&self, token: &str, expected: TokenClass) -> Result<TokenClaims, TokenError> {
        if !is_well_formed(token) {
            return Err(TokenError::Malformed);
        }
        // A well-formed token with an unreadable header has been altered
        if jsonwebtoken::decode_header(token).is_err() {
            return Err(TokenError::InvalidSignature);
        }

        match decode(token, &self.keys(expected).decoding) {
            Ok(claims) if claims.class == expected => Ok(claims),
            Ok(_) => Err(TokenError::ClassMismatch),
            Err(TokenError::InvalidSignature) => {
                match decode(token, &self.keys(expected.other()).decoding) {
                    Ok(_) => Err(TokenError::ClassMismatch),
                    Err(TokenError::Expired) => Err(TokenError::Expired),
                    Err(_) => Err(TokenError::InvalidSignature),
                }
            }
            Err(e) => Err(e),
        }
    }
}

fn decode(token: &str, key: &DecodingKey) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // Claims are only parsed once the signature has checked out
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
            _ => TokenError::InvalidSignature,
        })
}

/// Three non-empty base64url segments. Anything else cannot be a JWT at all.
fn is_well_formed(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

fn now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Not a JWT at all
    Malformed,
    /// Tampered, or signed with a secret this service does not hold
    InvalidSignature,
    /// Signature is fine but the expiry has passed
    Expired,
    /// Access token presented where a refresh token was expected, or vice versa
    ClassMismatch,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error, or an expiry past the end of time
    Clock,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::ClassMismatch => write!(f, "Wrong token class"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Clock => write!(f, "System time error or expiry out of range"),
        }
    }
}

impl std::error::Error for TokenError {}
