/// Notification store
///
/// Fire-and-forget delivery: a failed insert is logged, never surfaced to
/// the flow that triggered it.
use crate::db::models::Notification;
use crate::error::{ApiError, ApiResult};
use crate::ids;
use chrono::Utc;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Notifier {
    db: SqlitePool,
}

impl Notifier {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Deliver a notification to one user
    pub async fn notify(&self, user_id: &str, title: &str, message: &str) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, user_id, title, message, read, created_at)
            VALUES (?1, ?2, ?3, ?4, FALSE, ?5)
            "#,
        )
        .bind(ids::notification_id())
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(user_id = %user_id, "Failed to create notification: {}", e);
        }
    }

    /// Deliver a notification to every root user of an account
    pub async fn notify_account_root_users(&self, account_id: &str, title: &str, message: &str) {
        let root_users: Vec<String> = match sqlx::query_scalar(
            "SELECT user_id FROM users WHERE account_id = ?1 AND is_root_user = TRUE",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(account_id = %account_id, "Failed to look up root users: {}", e);
                return;
            }
        };

        for user_id in root_users {
            self.notify(&user_id, title, message).await;
        }
    }

    /// Newest-first notifications for one user
    pub async fn list_for_user(&self, user_id: &str) -> ApiResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, notification_id: &str, user_id: &str) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE notification_id = ?1 AND user_id = ?2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn seed_account_with_users(pool: &SqlitePool) {
        sqlx::query(
            "INSERT INTO accounts (account_id, name, is_active, is_verified, plan, subscription_status, created_at, updated_at)
             VALUES ('123456789012', 'Acme', TRUE, TRUE, 'free', 'active', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();

        for (user_id, email, root) in [
            ("root-user-1", "root@acme.test", true),
            ("member-user-1", "member@acme.test", false),
        ] {
            sqlx::query(
                "INSERT INTO users (user_id, account_id, email, username, password_hash, role, is_active, is_root_user, is_verified, created_at)
                 VALUES (?1, '123456789012', ?2, 'u', 'hash', 'user', TRUE, ?3, TRUE, ?4)",
            )
            .bind(user_id)
            .bind(email)
            .bind(root)
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_notify_and_list() {
        let pool = db::test_pool().await;
        seed_account_with_users(&pool).await;
        let notifier = Notifier::new(pool);

        notifier.notify("member-user-1", "Welcome", "Hello there").await;
        notifier.notify("member-user-1", "Second", "Another").await;

        let list = notifier.list_for_user("member-user-1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "Second");
        assert!(!list[0].read);
        assert!(list.iter().all(|n| n.notification_id.starts_with("notif")));
    }

    #[tokio::test]
    async fn test_notify_root_users_skips_members() {
        let pool = db::test_pool().await;
        seed_account_with_users(&pool).await;
        let notifier = Notifier::new(pool);

        notifier
            .notify_account_root_users("123456789012", "Account notice", "Something happened")
            .await;

        assert_eq!(notifier.list_for_user("root-user-1").await.unwrap().len(), 1);
        assert!(notifier.list_for_user("member-user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_owner() {
        let pool = db::test_pool().await;
        seed_account_with_users(&pool).await;
        let notifier = Notifier::new(pool);

        notifier.notify("member-user-1", "Welcome", "Hello").await;
        let list = notifier.list_for_user("member-user-1").await.unwrap();
        let id = list[0].notification_id.clone();

        // Another user cannot mark it
        assert!(notifier.mark_read(&id, "root-user-1").await.is_err());

        notifier.mark_read(&id, "member-user-1").await.unwrap();
        let list = notifier.list_for_user("member-user-1").await.unwrap();
        assert!(list[0].read);
    }
}
