/// Background task implementations
use crate::{context::AppContext, error::ApiResult};

/// Drop blacklist rows whose natural expiry has passed; the tokens they
/// covered are already dead
pub async fn sweep_token_blacklist(ctx: &AppContext) -> ApiResult<u64> {
    ctx.revocation.cleanup_expired().await
}

/// Drop pending signups whose verification window has closed
pub async fn sweep_pending_signups(ctx: &AppContext) -> ApiResult<u64> {
    ctx.auth.cleanup_expired_signups().await
}

/// Drop unfinished email-change requests past their 30-minute window
pub async fn sweep_email_changes(ctx: &AppContext) -> ApiResult<u64> {
    ctx.email_changes.cleanup_expired().await
}

/// Re-enable any suspended account that holds an admin user. Suspension
/// must never lock the platform operators out, so drift gets corrected
/// even if a suspension slipped past the write-side guard.
pub async fn reactivate_admin_accounts(ctx: &AppContext) -> ApiResult<u64> {
    ctx.accounts.reactivate_admin_accounts().await
}

/// Health check - verify the database answers
pub async fn health_check(ctx: &AppContext) -> ApiResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}
