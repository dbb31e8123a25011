/// Credential store
///
/// Password hashing plus the self-service reset-token lifecycle. Hashes
/// are Argon2id in PHC string format. Reset tokens are single-active per
/// user: issuing a new one overwrites any unredeemed predecessor, and
/// redemption clears both token fields in the same update.
use crate::db::models::User;
use crate::error::{ApiError, ApiResult};
use crate::ids;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

/// Reset tokens live for one hour
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Hash a password with Argon2id
pub fn hash_password(plain: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal("Failed to hash password".to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. Mismatch is Ok(false); a hash
/// that cannot be parsed is an internal error, not a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| ApiError::Internal("Stored password hash is malformed".to_string()))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(ApiError::Internal(
            "Password verification failed".to_string(),
        )),
    }
}

/// Reset-token operations backed by the user table
#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
}

impl CredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Issue a reset token for the user, overwriting any prior unredeemed
    /// token. Returns the raw token and its expiry.
    pub async fn issue_reset_token(&self, user_id: &str) -> ApiResult<(String, DateTime<Utc>)> {
        let token = ids::reset_token();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = ?1, reset_token_expires_at = ?2, last_password_reset_request = ?3
            WHERE user_id = ?4
            "#,
        )
        .bind(&token)
        .bind(expires_at)
        .bind(now)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        Ok((token, expires_at))
    }

    /// Look up the holder of an unredeemed reset token, distinguishing an
    /// unknown token from an expired one.
    pub async fn validate_reset_token(&self, token: &str) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Validation("Invalid or expired reset token".to_string()))?;

        if let Some(expires_at) = user.reset_token_expires_at {
            if Utc::now() > expires_at {
                return Err(ApiError::Validation(
                    "Reset token has expired".to_string(),
                ));
            }
        }

        Ok(user)
    }

    /// Redeem a reset token: store the new password, clear both token
    /// fields, and bump the user revocation epoch so outstanding sessions
    /// die with the old password.
    pub async fn redeem_reset_token(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let user = self.validate_reset_token(token).await?;
        let password_hash = hash_password(new_password)?;

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?1,
                reset_token = NULL,
                reset_token_expires_at = NULL,
                tokens_valid_after = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(&user.user_id)
        .execute(&self.db)
        .await?;

        tracing::info!(user_id = %user.user_id, "Password reset via token");
        Ok(())
    }
}
