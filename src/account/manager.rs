/// Account manager implementation using runtime queries
///
/// Owns the user-management and admin account operations. Lifecycle
/// changes go through the model transition methods so the invariant
/// checks live in one place; the manager persists the outcome and
/// fans out notifications and mail.

use crate::{
    account::{
        CreateUserRequest, DeletedUser, ProfileResponse, ProvisionedUser, UpdateProfileRequest,
        UpdateUserRequest, UserView,
    },
    credentials,
    db::models::{Account, Role, User},
    error::{ApiError, ApiResult},
    ids,
    mailer::Mailer,
    notify::Notifier,
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Account manager service
#[derive(Clone)]
pub struct AccountManager {
    db: SqlitePool,
    notifier: Notifier,
    mailer: Mailer,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, notifier: Notifier, mailer: Mailer) -> Self {
        Self { db, notifier, mailer }
    }

    /// Look up an account by its public identifier
    pub async fn get_account(&self, account_id: &str) -> ApiResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = ?1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
    }

    /// Look up a user by public identifier, any account
    pub async fn find_user(&self, user_id: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Look up a user inside a specific account
    pub async fn get_user_in_account(&self, account_id: &str, user_id: &str) -> ApiResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE user_id = ?1 AND account_id = ?2",
        )
        .bind(user_id)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// The account's root user
    pub async fn get_root_user(&self, account_id: &str) -> ApiResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE account_id = ?1 AND is_root_user = TRUE",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Root user not found".to_string()))
    }

    /// Whether any user of the account carries the admin role
    pub async fn account_holds_admin_user(&self, account_id: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE account_id = ?1 AND role = 'admin'",
        )
        .bind(account_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }

    async fn email_taken(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Profile view for the calling user
    pub async fn profile(&self, user: &User) -> ApiResult<ProfileResponse> {
        let account = self.get_account(&user.account_id).await?;
        Ok(ProfileResponse {
            user_id: user.user_id.clone(),
            account_id: user.account_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            is_active: user.is_active,
            is_root_user: user.is_root_user,
            is_verified: user.is_verified,
            last_login: user.last_login_at,
            created_at: user.created_at,
            account: (&account).into(),
        })
    }

    /// Apply a partial profile update for the calling user
    pub async fn update_profile(&self, user: &User, req: UpdateProfileRequest) -> ApiResult<()> {
        let mut username = user.username.clone();
        if let Some(new_username) = req.username {
            let trimmed = new_username.trim().to_string();
            if trimmed.is_empty() {
                return Err(ApiError::Validation("Username cannot be empty".to_string()));
            }
            username = trimmed;
        }
        let display_name = match req.display_name {
            Some(name) => Some(name),
            None => user.display_name.clone(),
        };

        sqlx::query("UPDATE users SET username = ?1, display_name = ?2 WHERE user_id = ?3")
            .bind(&username)
            .bind(&display_name)
            .bind(&user.user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Provision a user inside the root user's account
    ///
    /// Generates the email (when absent), the initial password and the
    /// dedicated signin URL, then notifies both sides and mails the
    /// credentials best-effort.
    pub async fn provision_user(
        &self,
        root: &User,
        req: CreateUserRequest,
    ) -> ApiResult<ProvisionedUser> {
        let username = req.username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::Validation("Username is required".to_string()));
        }
        let role = req.role.unwrap_or(Role::Member);

        let email = match req.email.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => e.to_lowercase(),
            _ => format!("{}@{}.devharbor.local", username, root.account_id),
        };
        if self.email_taken(&email).await? {
            return Err(ApiError::Validation("Email already exists".to_string()));
        }

        let initial_password = ids::initial_password();
        let password_hash = credentials::hash_password(&initial_password)?;
        let user_id = ids::user_id();
        let signin_url = ids::dedicated_signin_url(&root.account_id);
        let display_name = req
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(|name| name.trim().to_string());

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, account_id, email, username, password_hash, display_name,
                role, is_active, is_root_user, is_verified, dedicated_signin_url, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, TRUE, FALSE, TRUE, ?8, ?9)
            "#,
        )
        .bind(&user_id)
        .bind(&root.account_id)
        .bind(&email)
        .bind(&username)
        .bind(&password_hash)
        .bind(&display_name)
        .bind(role)
        .bind(&signin_url)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let greeting_name = display_name.clone().unwrap_or_else(|| username.clone());
        let root_name = root
            .display_name
            .clone()
            .unwrap_or_else(|| root.username.clone());
        self.notifier
            .notify(
                &user_id,
                "Welcome to DevHarbor",
                &format!(
                    "Hello {}! Your account has been created by {}.",
                    greeting_name, root_name
                ),
            )
            .await;
        self.notifier
            .notify(
                &root.user_id,
                "New User Created",
                &format!(
                    "User {} ({}) has been successfully created.",
                    greeting_name, email
                ),
            )
            .await;

        if let Err(e) = self
            .mailer
            .send_initial_credentials(
                &email,
                &username,
                &greeting_name,
                &initial_password,
                &signin_url,
            )
            .await
        {
            tracing::warn!("Failed to send credentials email to {}: {}", email, e);
        }

        let user = self.get_user_in_account(&root.account_id, &user_id).await?;
        tracing::info!("Provisioned user {} in account {}", user_id, root.account_id);

        Ok(ProvisionedUser {
            user: UserView::from(&user),
            initial_password,
            dedicated_signin_url: signin_url,
        })
    }

    /// All users of an account
    pub async fn list_users(&self, account_id: &str) -> ApiResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE account_id = ?1 ORDER BY created_at ASC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    /// Apply a partial update to a user in the account
    pub async fn update_user(
        &self,
        account_id: &str,
        user_id: &str,
        req: UpdateUserRequest,
    ) -> ApiResult<()> {
        let user = self.get_user_in_account(account_id, user_id).await?;

        let display_name = match req.display_name {
            Some(name) => Some(name),
            None => user.display_name,
        };
        let role = req.role.unwrap_or(user.role);

        sqlx::query("UPDATE users SET display_name = ?1, role = ?2 WHERE user_id = ?3")
            .bind(&display_name)
            .bind(role)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Deactivate a user; refused for root users
    pub async fn disable_user(&self, account_id: &str, user_id: &str) -> ApiResult<()> {
        let mut user = self.get_user_in_account(account_id, user_id).await?;
        user.deactivate()?;

        sqlx::query(
            "UPDATE users SET is_active = ?1, tokens_valid_after = ?2 WHERE user_id = ?3",
        )
        .bind(user.is_active)
        .bind(user.tokens_valid_after)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        tracing::info!("Disabled user {} in account {}", user_id, account_id);
        Ok(())
    }

    /// Reactivate a user. The revocation epoch stays put, so tokens
    /// issued before the disable remain dead.
    pub async fn enable_user(&self, account_id: &str, user_id: &str) -> ApiResult<()> {
        let mut user = self.get_user_in_account(account_id, user_id).await?;
        user.activate();

        sqlx::query("UPDATE users SET is_active = ?1 WHERE user_id = ?2")
            .bind(user.is_active)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        tracing::info!("Enabled user {} in account {}", user_id, account_id);
        Ok(())
    }

    /// Set a generated password on a user and return it
    pub async fn reset_user_password(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ApiResult<String> {
        let user = self.get_user_in_account(account_id, user_id).await?;

        let new_password = ids::initial_password();
        let password_hash = credentials::hash_password(&new_password)?;
        sqlx::query(
            "UPDATE users SET password_hash = ?1, tokens_valid_after = ?2 WHERE user_id = ?3",
        )
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(&user.user_id)
        .execute(&self.db)
        .await?;
        tracing::info!("Reset password for user {} in account {}", user_id, account_id);
        Ok(new_password)
    }

    /// Replace a user's dedicated signin URL
    pub async fn regenerate_signin_url(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> ApiResult<String> {
        let user = self.get_user_in_account(account_id, user_id).await?;
        if user.is_root_user {
            return Err(ApiError::Validation(
                "Root users sign in with their email and have no dedicated signin URL".to_string(),
            ));
        }

        let signin_url = ids::dedicated_signin_url(account_id);
        sqlx::query("UPDATE users SET dedicated_signin_url = ?1 WHERE user_id = ?2")
            .bind(&signin_url)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(signin_url)
    }

    /// Delete a user together with their notifications, stopped
    /// sandboxes and empty projects
    ///
    /// Blocked while the user owns running sandboxes or projects that
    /// still contain sandboxes.
    pub async fn delete_user(&self, acting: &User, user_id: &str) -> ApiResult<DeletedUser> {
        let target = self.get_user_in_account(&acting.account_id, user_id).await?;
        if target.is_root_user {
            return Err(ApiError::Forbidden(
                "Root users cannot be deleted".to_string(),
            ));
        }

        let running: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sandboxes WHERE owner_user_id = ?1 AND status = 'running'",
        )
        .bind(&target.user_id)
        .fetch_one(&self.db)
        .await?;
        if running > 0 {
            return Err(ApiError::Conflict(format!(
                "Cannot delete a user who owns {} running sandbox(es). Stop them first.",
                running
            )));
        }

        let busy_project: Option<String> = sqlx::query_scalar(
            r#"
            SELECT p.name
            FROM projects p
            JOIN sandboxes s ON s.project_id = p.project_id
            WHERE p.owner_user_id = ?1
            LIMIT 1
            "#,
        )
        .bind(&target.user_id)
        .fetch_optional(&self.db)
        .await?;
        if let Some(project_name) = busy_project {
            return Err(ApiError::Conflict(format!(
                "Cannot delete a user who owns projects with sandboxes. Project \"{}\" still contains sandboxes.",
                project_name
            )));
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM notifications WHERE user_id = ?1")
            .bind(&target.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sandboxes WHERE owner_user_id = ?1")
            .bind(&target.user_id)
            .execute(&mut *tx)
            .await?;
        let deleted_projects = sqlx::query("DELETE FROM projects WHERE owner_user_id = ?1")
            .bind(&target.user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM users WHERE user_id = ?1")
            .bind(&target.user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted_name = target
            .display_name
            .clone()
            .unwrap_or_else(|| target.username.clone());
        self.notifier
            .notify(
                &acting.user_id,
                "User Deleted",
                &format!(
                    "User {} ({}) has been successfully deleted.",
                    deleted_name, target.email
                ),
            )
            .await;

        let root_name = acting
            .display_name
            .clone()
            .unwrap_or_else(|| acting.username.clone());
        if let Err(e) = self
            .mailer
            .send_user_deletion_notice(
                &acting.email,
                &root_name,
                &deleted_name,
                &target.email,
                deleted_projects,
            )
            .await
        {
            tracing::warn!("Failed to send user deletion notice: {}", e);
        }

        tracing::info!(
            "Deleted user {} from account {} ({} empty projects removed)",
            user_id,
            acting.account_id,
            deleted_projects
        );
        Ok(DeletedUser {
            deleted_empty_projects: deleted_projects,
        })
    }

    /// Suspend an account. Refused while any user of the account holds
    /// the admin role; on success all tokens issued so far stop
    /// authorizing because the revocation epoch moves to now.
    pub async fn disable_account(&self, account_id: &str) -> ApiResult<()> {
        let mut account = self.get_account(account_id).await?;
        let holds_admin = self.account_holds_admin_user(account_id).await?;
        account.suspend(holds_admin)?;

        sqlx::query(
            "UPDATE accounts SET is_active = ?1, tokens_valid_after = ?2, updated_at = ?3 WHERE account_id = ?4",
        )
        .bind(account.is_active)
        .bind(account.tokens_valid_after)
        .bind(account.updated_at)
        .bind(account_id)
        .execute(&self.db)
        .await?;

        self.notifier
            .notify_account_root_users(
                account_id,
                "Account Disabled",
                "Your account has been disabled by the system administrator. Please contact support for assistance.",
            )
            .await;
        tracing::info!("Disabled account {}", account_id);
        Ok(())
    }

    /// Reactivate a suspended account. The revocation epoch is left in
    /// place.
    pub async fn enable_account(&self, account_id: &str) -> ApiResult<()> {
        let mut account = self.get_account(account_id).await?;
        account.reactivate();

        sqlx::query(
            "UPDATE accounts SET is_active = ?1, updated_at = ?2 WHERE account_id = ?3",
        )
        .bind(account.is_active)
        .bind(account.updated_at)
        .bind(account_id)
        .execute(&self.db)
        .await?;

        self.notifier
            .notify_account_root_users(
                account_id,
                "Account Enabled",
                "Your account has been enabled by the system administrator.",
            )
            .await;
        tracing::info!("Enabled account {}", account_id);
        Ok(())
    }

    /// Delete an account and everything it owns in one transaction
    pub async fn delete_account(&self, account_id: &str) -> ApiResult<()> {
        self.get_account(account_id).await?;

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "DELETE FROM notifications WHERE user_id IN (SELECT user_id FROM users WHERE account_id = ?1)",
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM api_keys WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sandboxes WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM projects WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM account_email_changes WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM token_blacklist WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM accounts WHERE account_id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Deleted account {} and all owned data", account_id);
        Ok(())
    }

    /// Set a generated password on the account's root user
    pub async fn reset_root_password(&self, account_id: &str) -> ApiResult<String> {
        let root = self.get_root_user(account_id).await?;

        let new_password = ids::initial_password();
        let password_hash = credentials::hash_password(&new_password)?;
        sqlx::query(
            "UPDATE users SET password_hash = ?1, tokens_valid_after = ?2 WHERE user_id = ?3",
        )
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(&root.user_id)
        .execute(&self.db)
        .await?;

        self.notifier
            .notify(
                &root.user_id,
                "Password Reset",
                "Your password has been reset by the system administrator. Please check your email for the new password.",
            )
            .await;
        if let Err(e) = self
            .mailer
            .send_generated_password(&root.email, &root.username, &new_password)
            .await
        {
            tracing::warn!("Failed to send generated password email: {}", e);
        }

        tracing::info!("Reset root password for account {}", account_id);
        Ok(new_password)
    }

    /// Re-activate inactive accounts that still hold an admin user.
    /// Returns the number of accounts repaired.
    pub async fn reactivate_admin_accounts(&self) -> ApiResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_active = TRUE, updated_at = ?1
            WHERE is_active = FALSE
              AND account_id IN (SELECT DISTINCT account_id FROM users WHERE role = 'admin')
            "#,
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let repaired = result.rows_affected();
        if repaired > 0 {
            tracing::warn!(
                "Re-activated {} account(s) that hold admin users but were inactive",
                repaired
            );
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn manager(pool: &SqlitePool) -> AccountManager {
        AccountManager::new(
            pool.clone(),
            Notifier::new(pool.clone()),
            Mailer::new(None).unwrap(),
        )
    }

    async fn seed_account(pool: &SqlitePool, account_id: &str) {
        sqlx::query(
            "INSERT INTO accounts (account_id, name, is_active, is_verified, plan, subscription_status, created_at, updated_at)
             VALUES (?1, 'Acme', TRUE, TRUE, 'free', 'active', ?2, ?2)",
        )
        .bind(account_id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_user(
        pool: &SqlitePool,
        account_id: &str,
        user_id: &str,
        email: &str,
        role: &str,
        is_root: bool,
    ) {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, account_id, email, username, password_hash,
                role, is_active, is_root_user, is_verified, created_at
            )
            VALUES (?1, ?2, ?3, 'someone', 'not-a-real-hash', ?4, TRUE, ?5, TRUE, ?6)
            "#,
        )
        .bind(user_id)
        .bind(account_id)
        .bind(email)
        .bind(role)
        .bind(is_root)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn fetch_user(pool: &SqlitePool, user_id: &str) -> User {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_provision_user_generates_everything() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;
        let root = fetch_user(&pool, "root-1").await;

        let provisioned = manager
            .provision_user(
                &root,
                CreateUserRequest {
                    username: "dev1".to_string(),
                    email: None,
                    display_name: Some("Dev One".to_string()),
                    role: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(provisioned.user.email, "dev1@111111111111.devharbor.local");
        assert_eq!(provisioned.user.role, Role::Member);
        assert!(provisioned.user.is_verified);
        assert!(!provisioned.user.is_root_user);
        assert_eq!(provisioned.initial_password.len(), 12);
        assert!(provisioned
            .dedicated_signin_url
            .starts_with("111111111111-"));

        let stored = fetch_user(&pool, &provisioned.user.user_id).await;
        assert!(credentials::verify_password(
            &provisioned.initial_password,
            &stored.password_hash
        )
        .unwrap());

        // one welcome notification for the new user, one for the root
        let notifications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(notifications, 2);
    }

    #[tokio::test]
    async fn test_provision_user_rejects_taken_email() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;
        let root = fetch_user(&pool, "root-1").await;

        let err = manager
            .provision_user(
                &root,
                CreateUserRequest {
                    username: "dev1".to_string(),
                    email: Some("root@example.com".to_string()),
                    display_name: None,
                    role: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_disable_user_refused_for_root() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;

        let err = manager
            .disable_user("111111111111", "root-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(fetch_user(&pool, "root-1").await.is_active);
    }

    #[tokio::test]
    async fn test_disable_user_sets_epoch() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        seed_user(&pool, "111111111111", "member-1", "m@example.com", "user", false).await;
        let manager = manager(&pool).await;

        manager.disable_user("111111111111", "member-1").await.unwrap();
        let user = fetch_user(&pool, "member-1").await;
        assert!(!user.is_active);
        assert!(user.tokens_valid_after.is_some());

        manager.enable_user("111111111111", "member-1").await.unwrap();
        let user = fetch_user(&pool, "member-1").await;
        assert!(user.is_active);
        assert!(user.tokens_valid_after.is_some());
    }

    #[tokio::test]
    async fn test_disable_account_refused_with_admin_user() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "admin", true).await;
        let manager = manager(&pool).await;

        let err = manager.disable_account("111111111111").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let account = manager.get_account("111111111111").await.unwrap();
        assert!(account.is_active);
        assert!(account.tokens_valid_after.is_none());
    }

    #[tokio::test]
    async fn test_disable_account_notifies_root_and_keeps_epoch_after_enable() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;

        manager.disable_account("111111111111").await.unwrap();
        let account = manager.get_account("111111111111").await.unwrap();
        assert!(!account.is_active);
        let epoch = account.tokens_valid_after;
        assert!(epoch.is_some());

        let notified: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = 'root-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(notified, 1);

        manager.enable_account("111111111111").await.unwrap();
        let account = manager.get_account("111111111111").await.unwrap();
        assert!(account.is_active);
        assert_eq!(account.tokens_valid_after, epoch);
    }

    #[tokio::test]
    async fn test_delete_user_refusals() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        seed_user(&pool, "111111111111", "member-1", "m@example.com", "user", false).await;
        let manager = manager(&pool).await;
        let root = fetch_user(&pool, "root-1").await;

        let err = manager.delete_user(&root, "root-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        sqlx::query(
            "INSERT INTO sandboxes (sandbox_id, account_id, owner_user_id, name, status, created_at)
             VALUES ('sbox1', '111111111111', 'member-1', 'box', 'running', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        let err = manager.delete_user(&root, "member-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_user_sweeps_owned_data() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        seed_user(&pool, "111111111111", "member-1", "m@example.com", "user", false).await;
        let manager = manager(&pool).await;
        let root = fetch_user(&pool, "root-1").await;

        sqlx::query(
            "INSERT INTO projects (project_id, account_id, owner_user_id, name, created_at)
             VALUES ('proj1', '111111111111', 'member-1', 'empty project', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO notifications (notification_id, user_id, title, message, read, created_at)
             VALUES ('n1', 'member-1', 'T', 'M', FALSE, ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let deleted = manager.delete_user(&root, "member-1").await.unwrap();
        assert_eq!(deleted.deleted_empty_projects, 1);

        assert!(manager.find_user("member-1").await.unwrap().is_none());
        let leftovers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = 'member-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;

        sqlx::query(
            "INSERT INTO projects (project_id, account_id, owner_user_id, name, created_at)
             VALUES ('proj1', '111111111111', 'root-1', 'p', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO api_keys (key_id, account_id, user_id, name, key, created_at)
             VALUES ('key1', '111111111111', 'root-1', 'k', 'secret', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        manager.delete_account("111111111111").await.unwrap();

        assert!(matches!(
            manager.get_account("111111111111").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
        let keys: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(keys, 0);
        let projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(projects, 0);
    }

    #[tokio::test]
    async fn test_reset_root_password() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_user(&pool, "111111111111", "root-1", "root@example.com", "user", true).await;
        let manager = manager(&pool).await;

        let new_password = manager.reset_root_password("111111111111").await.unwrap();
        let root = fetch_user(&pool, "root-1").await;
        assert!(credentials::verify_password(&new_password, &root.password_hash).unwrap());
        assert!(root.tokens_valid_after.is_some());
    }

    #[tokio::test]
    async fn test_reactivate_admin_accounts_repairs_only_admin_holders() {
        let pool = db::test_pool().await;
        seed_account(&pool, "111111111111").await;
        seed_account(&pool, "222222222222").await;
        seed_user(&pool, "111111111111", "admin-1", "a@example.com", "admin", true).await;
        seed_user(&pool, "222222222222", "root-2", "b@example.com", "user", true).await;
        sqlx::query("UPDATE accounts SET is_active = FALSE")
            .execute(&pool)
            .await
            .unwrap();
        let manager = manager(&pool).await;

        let repaired = manager.reactivate_admin_accounts().await.unwrap();
        assert_eq!(repaired, 1);
        assert!(manager.get_account("111111111111").await.unwrap().is_active);
        assert!(!manager.get_account("222222222222").await.unwrap().is_active);
    }
}
