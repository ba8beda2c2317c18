//! Argon2id password hashing.

use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use std::sync::OnceLock;

use crate::store::StoreError;

/// Hash a password with Argon2id (m=19456 KiB, t=2, p=1).
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let params = Params::new(19456, 2, 1, None)
        .map_err(|e| StoreError::Password(format!("Invalid Argon2 params: {}", e)))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| StoreError::Password(format!("Invalid salt: {}", e)))?;

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Password(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored PHC hash. Parameters are read from the hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| StoreError::Password(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hash checked when a login names nobody, so both failures cost the same.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Run a full verification against a throwaway hash. The result is discarded.
pub fn verify_dummy(password: &str) -> Result<(), StoreError> {
    let hash = DUMMY_HASH
        .get_or_init(|| hash_password("sessiongate-unknown-user").ok())
        .as_deref()
        .ok_or_else(|| StoreError::Password("Dummy hash unavailable".to_string()))?;

    verify_password(password, hash)?;
    Ok(())
}
