/// Two-party account email change
///
/// A change request carries one confirmation token per address. The
/// change is applied only when both sides confirm, in one transaction
/// that moves the account email, every user email in the account and
/// the completion timestamp together.

use crate::{
    account::{EmailChangeOutcome, EmailChangeRequest, EmailChangeStatus},
    db::models::{AccountEmailChange, User},
    error::{ApiError, ApiResult},
    ids,
    mailer::Mailer,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const EMAIL_CHANGE_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct EmailChangeManager {
    db: SqlitePool,
    mailer: Mailer,
    base_url: String,
}

impl EmailChangeManager {
    pub fn new(db: SqlitePool, mailer: Mailer, base_url: String) -> Self {
        Self { db, mailer, base_url }
    }

    /// Start an email change for the root user's account
    ///
    /// Replaces any pending request; the old tokens stop working.
    pub async fn request(&self, root: &User, req: EmailChangeRequest) -> ApiResult<()> {
        let current_email = req.current_email.trim().to_lowercase();
        let new_email = req.new_email.trim().to_lowercase();
        crate::validation::validate_email(&new_email)?;

        let account_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM accounts WHERE account_id = ?1")
                .bind(&root.account_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;
        if account_email.as_deref() != Some(current_email.as_str()) {
            return Err(ApiError::Validation(
                "Current email is incorrect".to_string(),
            ));
        }
        if current_email == new_email {
            return Err(ApiError::Validation(
                "New email must be different from current email".to_string(),
            ));
        }

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(&new_email)
            .fetch_one(&self.db)
            .await?;
        if taken > 0 {
            return Err(ApiError::Validation("Email already exists".to_string()));
        }

        let current_token = Uuid::new_v4().to_string();
        let new_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(EMAIL_CHANGE_TTL_MINUTES);

        // One pending request per account
        sqlx::query(
            "DELETE FROM account_email_changes WHERE account_id = ?1 AND completed_at IS NULL",
        )
        .bind(&root.account_id)
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO account_email_changes (
                change_id, account_id, current_email, new_email,
                current_email_token, new_email_token,
                current_confirmed, new_confirmed, expires_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, FALSE, FALSE, ?7, ?8)
            "#,
        )
        .bind(ids::email_change_id())
        .bind(&root.account_id)
        .bind(&current_email)
        .bind(&new_email)
        .bind(&current_token)
        .bind(&new_token)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        for (address, token) in [(&current_email, &current_token), (&new_email, &new_token)] {
            if let Err(e) = self
                .mailer
                .send_email_change_confirmation(address, token, &self.base_url)
                .await
            {
                tracing::warn!("Failed to send email change confirmation to {}: {}", address, e);
            }
        }

        tracing::info!(
            "Email change requested for account {} ({} -> {})",
            root.account_id,
            current_email,
            new_email
        );
        Ok(())
    }

    /// Confirm one side of a pending change
    ///
    /// When the second side confirms, the account email, every user
    /// email in the account and the completion timestamp move in one
    /// transaction; a failure leaves everything, including the
    /// confirmation flag, at its prior value.
    pub async fn confirm(&self, token: &str) -> ApiResult<EmailChangeOutcome> {
        let change = sqlx::query_as::<_, AccountEmailChange>(
            "SELECT * FROM account_email_changes WHERE current_email_token = ?1 OR new_email_token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired token".to_string()))?;

        if change.is_completed() {
            return Ok(EmailChangeOutcome::Completed {
                current_email: change.current_email,
                new_email: change.new_email,
                already_completed: true,
            });
        }
        if change.is_expired(Utc::now()) {
            return Err(ApiError::Validation("Token has expired".to_string()));
        }

        let confirming_current = change.current_email_token == token;
        let current_confirmed = change.current_confirmed || confirming_current;
        let new_confirmed = change.new_confirmed || !confirming_current;

        if current_confirmed && new_confirmed {
            let now = Utc::now();
            let mut tx = self.db.begin().await?;
            sqlx::query(
                "UPDATE account_email_changes
                 SET current_confirmed = TRUE, new_confirmed = TRUE, completed_at = ?1
                 WHERE change_id = ?2",
            )
            .bind(now)
            .bind(&change.change_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("UPDATE accounts SET email = ?1, updated_at = ?2 WHERE account_id = ?3")
                .bind(&change.new_email)
                .bind(now)
                .bind(&change.account_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE users SET email = ?1 WHERE account_id = ?2")
                .bind(&change.new_email)
                .bind(&change.account_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                "Email change completed for account {} ({} -> {})",
                change.account_id,
                change.current_email,
                change.new_email
            );
            return Ok(EmailChangeOutcome::Completed {
                current_email: change.current_email,
                new_email: change.new_email,
                already_completed: false,
            });
        }

        sqlx::query(
            "UPDATE account_email_changes SET current_confirmed = ?1, new_confirmed = ?2 WHERE change_id = ?3",
        )
        .bind(current_confirmed)
        .bind(new_confirmed)
        .bind(&change.change_id)
        .execute(&self.db)
        .await?;

        let pending_email = if current_confirmed {
            change.new_email
        } else {
            change.current_email
        };
        Ok(EmailChangeOutcome::Pending {
            pending_email,
            expires_at: change.expires_at,
        })
    }

    /// Status of the account's pending change, if any
    pub async fn status(&self, account_id: &str) -> ApiResult<EmailChangeStatus> {
        let change = sqlx::query_as::<_, AccountEmailChange>(
            "SELECT * FROM account_email_changes
             WHERE account_id = ?1 AND completed_at IS NULL
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(change) = change else {
            return Ok(EmailChangeStatus {
                has_pending_request: false,
                status: None,
                message: None,
                expires_at: None,
            });
        };

        let (status, message) = if change.is_fully_confirmed() {
            (
                "both_confirmed",
                "Both emails confirmed. Email change will be completed shortly.".to_string(),
            )
        } else if change.current_confirmed || change.new_confirmed {
            let pending_email = if change.current_confirmed {
                &change.new_email
            } else {
                &change.current_email
            };
            (
                "partial_confirmed",
                format!(
                    "One email confirmed. Waiting for confirmation from {}.",
                    pending_email
                ),
            )
        } else {
            (
                "none_confirmed",
                "No emails confirmed yet. Please check both email addresses for confirmation links."
                    .to_string(),
            )
        };

        Ok(EmailChangeStatus {
            has_pending_request: true,
            status: Some(status.to_string()),
            message: Some(message),
            expires_at: Some(change.expires_at),
        })
    }

    /// Drop expired, uncompleted requests. Returns the number removed.
    pub async fn cleanup_expired(&self) -> ApiResult<u64> {
        let result = sqlx::query(
            "DELETE FROM account_email_changes WHERE expires_at < ?1 AND completed_at IS NULL",
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn manager(pool: &SqlitePool) -> EmailChangeManager {
        EmailChangeManager::new(
            pool.clone(),
            Mailer::new(None).unwrap(),
            "http://localhost:8000".to_string(),
        )
    }

    async fn seed_account_with_root(
        pool: &SqlitePool,
        account_id: &str,
        email: &str,
    ) -> User {
        sqlx::query(
            "INSERT INTO accounts (account_id, name, email, is_active, is_verified, plan, subscription_status, created_at, updated_at)
             VALUES (?1, 'Acme', ?2, TRUE, TRUE, 'free', 'active', ?3, ?3)",
        )
        .bind(account_id)
        .bind(email)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, account_id, email, username, password_hash,
                role, is_active, is_root_user, is_verified, created_at
            )
            VALUES (?1, ?2, ?3, 'root', 'hash', 'user', TRUE, TRUE, TRUE, ?4)
            "#,
        )
        .bind(format!("root-{}", account_id))
        .bind(account_id)
        .bind(email)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn pending_change(pool: &SqlitePool, account_id: &str) -> AccountEmailChange {
        sqlx::query_as::<_, AccountEmailChange>(
            "SELECT * FROM account_email_changes WHERE account_id = ?1 AND completed_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn change_request(new_email: &str) -> EmailChangeRequest {
        EmailChangeRequest {
            current_email: "old@example.com".to_string(),
            new_email: new_email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_request_creates_pending_change() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;

        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();

        let change = pending_change(&pool, "111111111111").await;
        assert_ne!(change.current_email_token, change.new_email_token);
        assert!(!change.current_confirmed && !change.new_confirmed);
        assert!(change.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_request_validations() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;

        let err = manager
            .request(
                &root,
                EmailChangeRequest {
                    current_email: "wrong@example.com".to_string(),
                    new_email: "new@example.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = manager
            .request(&root, change_request("old@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // new address already used by a user somewhere
        seed_account_with_root(&pool, "222222222222", "taken@example.com").await;
        let err = manager
            .request(&root, change_request("taken@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_second_request_replaces_first() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;

        manager
            .request(&root, change_request("first@example.com"))
            .await
            .unwrap();
        let first = pending_change(&pool, "111111111111").await;

        manager
            .request(&root, change_request("second@example.com"))
            .await
            .unwrap();

        // the superseded tokens no longer resolve
        let err = manager.confirm(&first.current_email_token).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM account_email_changes WHERE account_id = '111111111111'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_single_confirmation_stays_pending() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;
        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();
        let change = pending_change(&pool, "111111111111").await;

        let outcome = manager.confirm(&change.current_email_token).await.unwrap();
        assert_eq!(
            outcome,
            EmailChangeOutcome::Pending {
                pending_email: "new@example.com".to_string(),
                expires_at: change.expires_at,
            }
        );

        let stored = pending_change(&pool, "111111111111").await;
        assert!(stored.current_confirmed);
        assert!(!stored.new_confirmed);

        let status = manager.status("111111111111").await.unwrap();
        assert_eq!(status.status.as_deref(), Some("partial_confirmed"));
    }

    #[tokio::test]
    async fn test_both_confirmations_apply_change() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;
        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();
        let change = pending_change(&pool, "111111111111").await;

        manager.confirm(&change.current_email_token).await.unwrap();
        let outcome = manager.confirm(&change.new_email_token).await.unwrap();
        assert_eq!(
            outcome,
            EmailChangeOutcome::Completed {
                current_email: "old@example.com".to_string(),
                new_email: "new@example.com".to_string(),
                already_completed: false,
            }
        );

        let account_email: String =
            sqlx::query_scalar("SELECT email FROM accounts WHERE account_id = '111111111111'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(account_email, "new@example.com");
        let user_email: String =
            sqlx::query_scalar("SELECT email FROM users WHERE user_id = 'root-111111111111'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(user_email, "new@example.com");

        // confirming again reports completion instead of re-applying
        let outcome = manager.confirm(&change.new_email_token).await.unwrap();
        assert!(matches!(
            outcome,
            EmailChangeOutcome::Completed {
                already_completed: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;
        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();
        let change = pending_change(&pool, "111111111111").await;

        sqlx::query("UPDATE account_email_changes SET expires_at = ?1 WHERE change_id = ?2")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(&change.change_id)
            .execute(&pool)
            .await
            .unwrap();

        let err = manager.confirm(&change.current_email_token).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_emails_untouched() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        // a second user whose email would collide after the account-wide
        // rewrite, which makes the commit transaction fail
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, account_id, email, username, password_hash,
                role, is_active, is_root_user, is_verified, created_at
            )
            VALUES ('member-1', '111111111111', 'member@example.com', 'm', 'hash', 'user', TRUE, FALSE, TRUE, ?1)
            "#,
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let manager = manager(&pool).await;
        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();
        let change = pending_change(&pool, "111111111111").await;

        manager.confirm(&change.current_email_token).await.unwrap();
        let err = manager.confirm(&change.new_email_token).await;
        assert!(err.is_err());

        let account_email: String =
            sqlx::query_scalar("SELECT email FROM accounts WHERE account_id = '111111111111'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(account_email, "old@example.com");
        let root_email: String =
            sqlx::query_scalar("SELECT email FROM users WHERE user_id = 'root-111111111111'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(root_email, "old@example.com");

        // the second-side flag rolled back with the rest
        let stored = pending_change(&pool, "111111111111").await;
        assert!(stored.current_confirmed);
        assert!(!stored.new_confirmed);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_uncompleted() {
        let pool = db::test_pool().await;
        let root = seed_account_with_root(&pool, "111111111111", "old@example.com").await;
        let manager = manager(&pool).await;
        manager
            .request(&root, change_request("new@example.com"))
            .await
            .unwrap();

        assert_eq!(manager.cleanup_expired().await.unwrap(), 0);

        sqlx::query("UPDATE account_email_changes SET expires_at = ?1")
            .bind(Utc::now() - Duration::minutes(1))
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(manager.cleanup_expired().await.unwrap(), 1);

        let status = manager.status("111111111111").await.unwrap();
        assert!(!status.has_pending_request);
    }
}
