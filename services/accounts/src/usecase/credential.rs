use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::RngExt;

use crate::error::AccountsServiceError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Length of email-confirmation tokens.
const TOKEN_LEN: usize = 48;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn check_password_strength(password: &str) -> Result<(), AccountsServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountsServiceError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Hash with Argon2id and a fresh random salt, in PHC string format.
pub fn hash_password(password: &str) -> Result<String, AccountsServiceError> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// `false` for a wrong password as well as for an unparseable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool; Argon2 is too slow for the executor.
pub async fn hash_password_off_thread(password: &str) -> Result<String, AccountsServiceError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow!("password hashing task failed: {e}"))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_off_thread(
    password: &str,
    stored_hash: &str,
) -> Result<bool, AccountsServiceError> {
    let (password, stored_hash) = (password.to_owned(), stored_hash.to_owned());
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| anyhow!("password verification task failed: {e}").into())
}

pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}
