//! Password hashing and credential verification

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::{
    models::Account,
    repositories::{AccountStore, StoreResult},
};

/// Hash a plaintext password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a plaintext password against a stored hash
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();
    let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

    Ok(result.is_ok())
}

/// Hash on the blocking pool so Argon2 never stalls an async worker
pub async fn hash_password_async(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// Verify on the blocking pool so Argon2 never stalls an async worker
pub async fn verify_password_async(password_hash: &str, password: &str) -> Result<bool> {
    let password_hash = password_hash.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password_hash, &password)).await?
}

/// Hash checked against when the phone number is unknown, so that path costs
/// the same Argon2 verification as a wrong password
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_password("decoy-password-never-matches").ok())
        .as_deref()
}

/// Resolve the account owning `phone_number` if `password` matches.
///
/// Unknown numbers, wrong passwords, unreadable hashes and inactive accounts
/// all come back as `None` so callers cannot tell them apart, and every path
/// runs one password verification.
pub async fn authenticate(
    store: &dyn AccountStore,
    phone_number: &str,
    password: &str,
) -> StoreResult<Option<Account>> {
    let Some(account) = store.find_by_phone_number(phone_number).await? else {
        let password = password.to_string();
        let _ = tokio::task::spawn_blocking(move || {
            decoy_hash().map(|decoy| verify_password(decoy, &password))
        })
        .await;
        debug!("Authentication failed: unknown phone number");
        return Ok(None);
    };

    match verify_password_async(&account.password_hash, password).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("Authentication failed: wrong password for account {}", account.id);
            return Ok(None);
        }
        Err(e) => {
            warn!("Stored password hash for account {} is unreadable: {}", account.id, e);
            return Ok(None);
        }
    }

    if !account.is_active {
        debug!("Authentication failed: account {} is inactive", account.id);
        return Ok(None);
    }

    Ok(Some(account))
}
