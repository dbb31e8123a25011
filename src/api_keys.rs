/// API key management
///
/// Keys are opaque random strings scoped to an account. The raw key
/// value is returned exactly once at creation; listings only expose
/// metadata.
use crate::db::models::ApiKey;
use crate::error::{ApiError, ApiResult};
use crate::ids;
use chrono::Utc;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct ApiKeyManager {
    db: SqlitePool,
}

impl ApiKeyManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a key and return it alongside the raw secret
    pub async fn create_key(
        &self,
        account_id: &str,
        user_id: &str,
        name: &str,
    ) -> ApiResult<(ApiKey, String)> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Key name is required".to_string()));
        }

        let key_id = ids::api_key_id();
        let raw_key = ids::api_key();
        sqlx::query(
            r#"
            INSERT INTO api_keys (key_id, account_id, user_id, name, key, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&key_id)
        .bind(account_id)
        .bind(user_id)
        .bind(name)
        .bind(&raw_key)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_id = ?1")
            .bind(&key_id)
            .fetch_one(&self.db)
            .await?;
        Ok((key, raw_key))
    }

    pub async fn list_keys(&self, account_id: &str) -> ApiResult<Vec<ApiKey>> {
        let rows = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE account_id = ?1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn delete_key(&self, key_id: &str, account_id: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM api_keys WHERE key_id = ?1 AND account_id = ?2")
            .bind(key_id)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("API key not found".to_string()));
        }
        Ok(())
    }
}
