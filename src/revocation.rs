/// Token revocation registry
///
/// Two mechanisms compose with cryptographic verification:
/// - a blacklist of SHA-256 token hashes for explicit per-token
///   revocation (signout, rotation), swept by expiry;
/// - revocation epochs (`tokens_valid_after` on accounts and users)
///   compared against each token's issued-at claim, which invalidate
///   every token minted before a disable in one write.
use crate::error::ApiResult;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// SHA-256 hex digest of a raw bearer token
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when a token issued at `iat` predates the revocation epoch
pub fn issued_before(iat: i64, epoch: Option<DateTime<Utc>>) -> bool {
    match epoch {
        Some(epoch) => iat < epoch.timestamp(),
        None => false,
    }
}

#[derive(Clone)]
pub struct RevocationRegistry {
    db: SqlitePool,
}

impl RevocationRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Check whether the raw token has an unexpired blacklist row
    pub async fn is_revoked(&self, raw_token: &str) -> ApiResult<bool> {
        let hash = hash_token(raw_token);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM token_blacklist WHERE token_hash = ?1 AND expires_at > ?2",
        )
        .bind(&hash)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    /// Blacklist a raw token. The ttl should cover the token's remaining
    /// lifetime so revocation outlives natural expiry. Idempotent.
    pub async fn revoke(
        &self,
        raw_token: &str,
        user_id: &str,
        account_id: &str,
        ttl: Duration,
    ) -> ApiResult<()> {
        let hash = hash_token(raw_token);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO token_blacklist (token_hash, user_id, account_id, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(token_hash) DO NOTHING
            "#,
        )
        .bind(&hash)
        .bind(user_id)
        .bind(account_id)
        .bind(now + ttl)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(user_id = %user_id, account_id = %account_id, "Token revoked");
        Ok(())
    }

    /// Invalidate every outstanding token for an account by bumping its
    /// revocation epoch.
    pub async fn revoke_account_tokens(&self, account_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE accounts SET tokens_valid_after = ?1 WHERE account_id = ?2")
            .bind(Utc::now())
            .bind(account_id)
            .execute(&self.db)
            .await?;

        tracing::info!(account_id = %account_id, "Account revocation epoch bumped");
        Ok(())
    }

    /// Invalidate every outstanding token for a user
    pub async fn revoke_user_tokens(&self, user_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET tokens_valid_after = ?1 WHERE user_id = ?2")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %user_id, "User revocation epoch bumped");
        Ok(())
    }

    /// Delete expired blacklist rows, returning the number removed
    pub async fn cleanup_expired(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
