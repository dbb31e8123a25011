/// User management endpoints under /api/user-management
use crate::{
    account::{
        CreateUserRequest, EmailChangeConfirmation, EmailChangeOutcome, EmailChangeRequest,
        EmailChangeStatus, ProfileResponse, UpdateProfileRequest, UpdateUserRequest, UserView,
    },
    api::middleware::AuthSession,
    auth::{DedicatedSigninRequest, MessageResponse, RotatePasswordRequest, SigninResponse},
    context::AppContext,
    db::models::User,
    error::{ApiError, ApiResult},
    signin_url::SigninUrlValidation,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Routes reachable without a bearer token: the pre-signin screen and
/// email-change confirmation links opened from an inbox
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/user-management/validate-signin-url/:signin_url",
            get(validate_signin_url),
        )
        .route(
            "/api/user-management/dedicated-signin",
            post(dedicated_signin),
        )
        .route(
            "/api/user-management/email-change/confirm",
            post(email_change_confirm),
        )
}

/// Routes that require an authenticated session
pub fn session_routes() -> Router<AppContext> {
    Router::new()
        .route("/api/user-management/profile", get(get_profile))
        .route("/api/user-management/profile", put(update_profile))
        .route("/api/user-management/rotate-password", post(rotate_password))
        .route("/api/user-management/users", get(list_users))
        .route("/api/user-management/users", post(create_user))
        .route("/api/user-management/users/:user_id", put(update_user))
        .route("/api/user-management/users/:user_id", delete(delete_user))
        .route(
            "/api/user-management/users/:user_id/disable",
            post(disable_user),
        )
        .route(
            "/api/user-management/users/:user_id/enable",
            post(enable_user),
        )
        .route(
            "/api/user-management/users/:user_id/reset-password",
            post(reset_user_password),
        )
        .route(
            "/api/user-management/users/:user_id/regenerate-signin-url",
            post(regenerate_signin_url),
        )
        .route(
            "/api/user-management/email-change/request",
            post(email_change_request),
        )
        .route(
            "/api/user-management/email-change/status",
            get(email_change_status),
        )
}

/// User provisioning and account email changes are reserved for the
/// account's root user
fn require_root(user: &User, action: &str) -> ApiResult<()> {
    if !user.is_root_user {
        return Err(ApiError::Forbidden(format!(
            "Only root users can {action}"
        )));
    }
    Ok(())
}

/// Pre-signin lookup of a dedicated signin URL
async fn validate_signin_url(
    State(ctx): State<AppContext>,
    Path(signin_url): Path<String>,
) -> ApiResult<Json<SigninUrlValidation>> {
    Ok(Json(ctx.signin_urls.validate(signin_url.trim()).await?))
}

/// Signin with a dedicated URL plus password
async fn dedicated_signin(
    State(ctx): State<AppContext>,
    Json(req): Json<DedicatedSigninRequest>,
) -> ApiResult<Json<SigninResponse>> {
    let result = ctx.auth.dedicated_signin(req).await;
    match &result {
        Ok(resp) if resp.is_suspended() => crate::metrics::record_signin("dedicated", "suspended"),
        Ok(_) => crate::metrics::record_signin("dedicated", "success"),
        Err(_) => crate::metrics::record_signin("dedicated", "rejected"),
    }
    Ok(Json(result?))
}

#[derive(Debug, Serialize)]
struct EmailChangeConfirmResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl From<EmailChangeOutcome> for EmailChangeConfirmResponse {
    fn from(outcome: EmailChangeOutcome) -> Self {
        match outcome {
            EmailChangeOutcome::Completed {
                current_email,
                new_email,
                already_completed,
            } => Self {
                status: "completed",
                message: if already_completed {
                    "Email change has already been completed successfully.".to_string()
                } else {
                    "Account email changed successfully! Both confirmation links have been verified."
                        .to_string()
                },
                current_email: Some(current_email),
                new_email: Some(new_email),
                pending_email: None,
                expires_at: None,
            },
            EmailChangeOutcome::Pending {
                pending_email,
                expires_at,
            } => Self {
                status: "pending",
                message: format!(
                    "Email confirmed successfully. Please check {pending_email} for the second confirmation link to complete the change."
                ),
                current_email: None,
                new_email: None,
                pending_email: Some(pending_email),
                expires_at: Some(expires_at),
            },
        }
    }
}

/// Confirm one side of an account email change; the link carries the
/// token, no session needed
async fn email_change_confirm(
    State(ctx): State<AppContext>,
    Json(req): Json<EmailChangeConfirmation>,
) -> ApiResult<Json<EmailChangeConfirmResponse>> {
    let outcome = ctx.email_changes.confirm(req.token.trim()).await?;
    Ok(Json(outcome.into()))
}

/// Current user with their account
async fn get_profile(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(ctx.accounts.profile(&session.user).await?))
}

/// Update the calling user's display name or username
async fn update_profile(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.accounts.update_profile(&session.user, req).await?;
    Ok(Json(MessageResponse::new("Profile updated successfully")))
}

/// Change the calling user's password, proving the current one first
async fn rotate_password(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<RotatePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        ctx.auth
            .rotate_password(&session.user, &session.raw_token, &session.claims, req)
            .await?,
    ))
}

#[derive(Debug, Serialize)]
struct ListUsersResponse {
    users: Vec<UserView>,
}

async fn list_users(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ListUsersResponse>> {
    require_root(&session.user, "list users")?;
    let users = ctx.accounts.list_users(&session.user.account_id).await?;
    Ok(Json(ListUsersResponse {
        users: users.iter().map(UserView::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
struct CreateUserResponse {
    message: &'static str,
    user: UserView,
    initial_password: String,
    dedicated_signin_url: String,
}

/// Provision a user; the generated password appears in this response
/// and nowhere else
async fn create_user(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    require_root(&session.user, "create users")?;
    let provisioned = ctx.accounts.provision_user(&session.user, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            message: "User created successfully",
            user: provisioned.user,
            initial_password: provisioned.initial_password,
            dedicated_signin_url: provisioned.dedicated_signin_url,
        }),
    ))
}

async fn update_user(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<MessageResponse>> {
    require_root(&session.user, "update users")?;
    ctx.accounts
        .update_user(&session.user.account_id, &user_id, req)
        .await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

async fn disable_user(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_root(&session.user, "disable users")?;
    ctx.accounts
        .disable_user(&session.user.account_id, &user_id)
        .await?;
    Ok(Json(MessageResponse::new("User disabled successfully")))
}

async fn enable_user(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_root(&session.user, "enable users")?;
    ctx.accounts
        .enable_user(&session.user.account_id, &user_id)
        .await?;
    Ok(Json(MessageResponse::new("User enabled successfully")))
}

#[derive(Debug, Serialize)]
struct ResetUserPasswordResponse {
    message: &'static str,
    new_password: String,
}

/// Set a generated password on a managed user
async fn reset_user_password(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ResetUserPasswordResponse>> {
    require_root(&session.user, "reset user passwords")?;
    let new_password = ctx
        .accounts
        .reset_user_password(&session.user.account_id, &user_id)
        .await?;
    Ok(Json(ResetUserPasswordResponse {
        message: "Password reset successfully",
        new_password,
    }))
}

#[derive(Debug, Serialize)]
struct RegenerateSigninUrlResponse {
    message: &'static str,
    dedicated_signin_url: String,
}

async fn regenerate_signin_url(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RegenerateSigninUrlResponse>> {
    require_root(&session.user, "regenerate signin URLs")?;
    let dedicated_signin_url = ctx
        .accounts
        .regenerate_signin_url(&session.user.account_id, &user_id)
        .await?;
    Ok(Json(RegenerateSigninUrlResponse {
        message: "Signin URL regenerated successfully",
        dedicated_signin_url,
    }))
}

#[derive(Debug, Serialize)]
struct DeleteUserResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_empty_projects: Option<u64>,
}

async fn delete_user(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DeleteUserResponse>> {
    require_root(&session.user, "delete users")?;
    let deleted = ctx.accounts.delete_user(&session.user, &user_id).await?;
    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully",
        deleted_empty_projects: (deleted.deleted_empty_projects > 0)
            .then_some(deleted.deleted_empty_projects),
    }))
}

/// Start the two-token account email change; both addresses get a link
async fn email_change_request(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<EmailChangeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    require_root(&session.user, "change account email")?;
    ctx.email_changes.request(&session.user, req).await?;
    Ok(Json(MessageResponse::new(
        "Email change request created. Confirmation links sent to both email addresses.",
    )))
}

async fn email_change_status(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<EmailChangeStatus>> {
    require_root(&session.user, "check email change status")?;
    Ok(Json(
        ctx.email_changes.status(&session.user.account_id).await?,
    ))
}
