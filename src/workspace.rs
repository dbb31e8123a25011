/// Workspace metadata store
///
/// Plain keyed CRUD for projects and sandboxes. Actual sandbox
/// provisioning happens outside this service; rows here only carry
/// lifecycle metadata, and deletion rules protect referential integrity.
use crate::db::models::{Project, Sandbox};
use crate::error::{ApiError, ApiResult};
use crate::ids;
use chrono::Utc;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct WorkspaceStore {
    db: SqlitePool,
}

impl WorkspaceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create_project(
        &self,
        account_id: &str,
        owner_user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Project> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Project name is required".to_string()));
        }

        let project_id = ids::project_id();
        sqlx::query(
            r#"
            INSERT INTO projects (project_id, account_id, owner_user_id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&project_id)
        .bind(account_id)
        .bind(owner_user_id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.get_project(&project_id, account_id)
            .await?
            .ok_or_else(|| ApiError::Internal("Project vanished after insert".to_string()))
    }

    pub async fn list_projects(&self, account_id: &str) -> ApiResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE account_id = ?1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_project(
        &self,
        project_id: &str,
        account_id: &str,
    ) -> ApiResult<Option<Project>> {
        let row = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE project_id = ?1 AND account_id = ?2",
        )
        .bind(project_id)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    /// Delete a project; refused while sandboxes still reference it
    pub async fn delete_project(&self, project_id: &str, account_id: &str) -> ApiResult<()> {
        let sandbox_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sandboxes WHERE project_id = ?1")
                .bind(project_id)
                .fetch_one(&self.db)
                .await?;
        if sandbox_count > 0 {
            return Err(ApiError::Conflict(
                "Project still contains sandboxes".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM projects WHERE project_id = ?1 AND account_id = ?2")
            .bind(project_id)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Project not found".to_string()));
        }
        Ok(())
    }

    pub async fn create_sandbox(
        &self,
        account_id: &str,
        owner_user_id: &str,
        project_id: Option<&str>,
        name: &str,
        template: Option<&str>,
    ) -> ApiResult<Sandbox> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Sandbox name is required".to_string()));
        }
        if let Some(project_id) = project_id {
            if self.get_project(project_id, account_id).await?.is_none() {
                return Err(ApiError::NotFound("Project not found".to_string()));
            }
        }

        let sandbox_id = ids::sandbox_id();
        sqlx::query(
            r#"
            INSERT INTO sandboxes (sandbox_id, account_id, owner_user_id, project_id, name, template, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'stopped', ?7)
            "#,
        )
        .bind(&sandbox_id)
        .bind(account_id)
        .bind(owner_user_id)
        .bind(project_id)
        .bind(name)
        .bind(template)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.get_sandbox(&sandbox_id, account_id)
            .await?
            .ok_or_else(|| ApiError::Internal("Sandbox vanished after insert".to_string()))
    }

    pub async fn list_sandboxes(&self, account_id: &str) -> ApiResult<Vec<Sandbox>> {
        let rows = sqlx::query_as::<_, Sandbox>(
            "SELECT * FROM sandboxes WHERE account_id = ?1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_sandbox(
        &self,
        sandbox_id: &str,
        account_id: &str,
    ) -> ApiResult<Option<Sandbox>> {
        let row = sqlx::query_as::<_, Sandbox>(
            "SELECT * FROM sandboxes WHERE sandbox_id = ?1 AND account_id = ?2",
        )
        .bind(sandbox_id)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    pub async fn delete_sandbox(&self, sandbox_id: &str, account_id: &str) -> ApiResult<()> {
        let result =
            sqlx::query("DELETE FROM sandboxes WHERE sandbox_id = ?1 AND account_id = ?2")
                .bind(sandbox_id)
                .bind(account_id)
                .execute(&self.db)
                .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Sandbox not found".to_string()));
        }
        Ok(())
    }

    /// Whether the user owns sandboxes in running status
    pub async fn user_owns_running_sandboxes(&self, user_id: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sandboxes WHERE owner_user_id = ?1 AND status = 'running'",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }

    /// Whether the user owns projects that still contain sandboxes
    pub async fn user_owns_projects_with_sandboxes(&self, user_id: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM projects p
            JOIN sandboxes s ON s.project_id = p.project_id
            WHERE p.owner_user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn seed_account(pool: &SqlitePool) {
        sqlx::query(
            "INSERT INTO accounts (account_id, name, is_active, is_verified, plan, subscription_status, created_at, updated_at)
             VALUES ('123456789012', 'Acme', TRUE, TRUE, 'free', 'active', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_project_crud() {
        let pool = db::test_pool().await;
        seed_account(&pool).await;
        let store = WorkspaceStore::new(pool);

        let project = store
            .create_project("123456789012", "owner-1", "API experiments", Some("scratch"))
            .await
            .unwrap();
        assert!(project.project_id.starts_with("proj"));

        let listed = store.list_projects("123456789012").await.unwrap();
        assert_eq!(listed.len(), 1);

        store
            .delete_project(&project.project_id, "123456789012")
            .await
            .unwrap();
        assert!(store.list_projects("123456789012").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_project_delete_refused_with_sandboxes() {
        let pool = db::test_pool().await;
        seed_account(&pool).await;
        let store = WorkspaceStore::new(pool);

        let project = store
            .create_project("123456789012", "owner-1", "Busy project", None)
            .await
            .unwrap();
        store
            .create_sandbox(
                "123456789012",
                "owner-1",
                Some(&project.project_id),
                "dev box",
                Some("ubuntu-22"),
            )
            .await
            .unwrap();

        let err = store
            .delete_project(&project.project_id, "123456789012")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_sandbox_created_stopped() {
        let pool = db::test_pool().await;
        seed_account(&pool).await;
        let store = WorkspaceStore::new(pool);

        let sandbox = store
            .create_sandbox("123456789012", "owner-1", None, "dev box", None)
            .await
            .unwrap();
        assert_eq!(sandbox.status, "stopped");
        assert!(sandbox.sandbox_id.starts_with("sbox"));
    }

    #[tokio::test]
    async fn test_user_dependency_checks() {
        let pool = db::test_pool().await;
        seed_account(&pool).await;
        let store = WorkspaceStore::new(pool.clone());

        assert!(!store.user_owns_running_sandboxes("owner-1").await.unwrap());
        assert!(!store.user_owns_projects_with_sandboxes("owner-1").await.unwrap());

        let project = store
            .create_project("123456789012", "owner-1", "P", None)
            .await
            .unwrap();
        let sandbox = store
            .create_sandbox("123456789012", "owner-1", Some(&project.project_id), "S", None)
            .await
            .unwrap();

        assert!(store.user_owns_projects_with_sandboxes("owner-1").await.unwrap());
        assert!(!store.user_owns_running_sandboxes("owner-1").await.unwrap());

        sqlx::query("UPDATE sandboxes SET status = 'running' WHERE sandbox_id = ?1")
            .bind(&sandbox.sandbox_id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(store.user_owns_running_sandboxes("owner-1").await.unwrap());
    }
}
