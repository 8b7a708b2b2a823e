//! Password hashing and credential checks.
//!
//! Passwords are stored as Argon2id PHC strings; the salt is embedded in the hash.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};

use crate::{db::DbPool, error::AppError, models::user::User};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| anyhow::anyhow!("Failed to encode password salt: {e}"))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Constant-time comparison of `password` against a stored PHC hash.
///
/// A malformed stored hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// [`hash_password`] on the blocking pool; Argon2 takes tens of milliseconds.
pub async fn hash_password_async(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {e}"))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_async(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let (password, stored_hash) = (password.to_string(), stored_hash.to_string());
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {e}"))?;
    Ok(matches)
}

/// Look up the user by email and check the password.
///
/// # Errors
///
/// - `InvalidCredentials`: unknown email or wrong password (not distinguished)
/// - `Database`: query failed
pub async fn authenticate(pool: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM app_users WHERE email = $1")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password_async(password, &user.password_hash).await? {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}
