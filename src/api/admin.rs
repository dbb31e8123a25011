/// Platform admin endpoints under /api/admin
///
/// Routing wraps these in the admin guard, so handlers can assume the
/// caller holds the admin role.
use crate::{auth::MessageResponse, context::AppContext, error::ApiResult};
use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::Serialize;

pub fn admin_routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/admin/accounts/:account_id/disable",
            post(disable_account),
        )
        .route(
            "/api/admin/accounts/:account_id/enable",
            post(enable_account),
        )
        .route("/api/admin/accounts/:account_id", delete(delete_account))
        .route(
            "/api/admin/accounts/:account_id/reset-root-password",
            post(reset_root_password),
        )
}

/// Suspend an account and kill its outstanding tokens
async fn disable_account(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.accounts.disable_account(&account_id).await?;
    Ok(Json(MessageResponse::new("Account disabled successfully")))
}

async fn enable_account(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.accounts.enable_account(&account_id).await?;
    Ok(Json(MessageResponse::new("Account enabled successfully")))
}

/// Cascade delete of the account and everything under it
async fn delete_account(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.accounts.delete_account(&account_id).await?;
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

#[derive(Debug, Serialize)]
struct ResetRootPasswordResponse {
    message: &'static str,
    new_password: String,
}

/// Set a generated password on the account's root user
async fn reset_root_password(
    State(ctx): State<AppContext>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<ResetRootPasswordResponse>> {
    let new_password = ctx.accounts.reset_root_password(&account_id).await?;
    Ok(Json(ResetRootPasswordResponse {
        message: "Password reset successfully",
        new_password,
    }))
}
