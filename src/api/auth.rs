/// Authentication endpoints under /api/auth
use crate::{
    api::middleware::AuthSession,
    auth::{
        MessageResponse, ResendVerificationRequest, ResetPasswordConfirmRequest,
        ResetPasswordRequest, ResetTokenValidation, SigninRequest, SigninResponse, SignupRequest,
        VerifyEmailRequest,
    },
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};

/// Routes reachable without a bearer token
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/verify-email", post(verify_email))
        .route("/api/auth/resend-verification", post(resend_verification))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/reset-password/confirm", post(reset_password_confirm))
        .route(
            "/api/auth/reset-password/validate/:token",
            get(validate_reset_token),
        )
}

/// Routes that require an authenticated session
pub fn session_routes() -> Router<AppContext> {
    Router::new().route("/api/auth/signout", post(signout))
}

/// Register a new account holder and mail the verification code
async fn signup(
    State(ctx): State<AppContext>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(ctx.auth.signup(req).await?))
}

/// Primary email/password signin
async fn signin(
    State(ctx): State<AppContext>,
    Json(req): Json<SigninRequest>,
) -> ApiResult<Json<SigninResponse>> {
    let result = ctx.auth.signin(req).await;
    match &result {
        Ok(resp) if resp.is_suspended() => crate::metrics::record_signin("primary", "suspended"),
        Ok(_) => crate::metrics::record_signin("primary", "success"),
        Err(_) => crate::metrics::record_signin("primary", "rejected"),
    }
    Ok(Json(result?))
}

/// Redeem a verification code, creating the account and its root user
async fn verify_email(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(ctx.auth.verify_email(req).await?))
}

/// Reissue the verification code for a pending signup
async fn resend_verification(
    State(ctx): State<AppContext>,
    Json(req): Json<ResendVerificationRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(ctx.auth.resend_verification(req).await?))
}

/// Start a password reset; the response never reveals whether the
/// email is registered
async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(ctx.auth.request_password_reset(req).await?))
}

/// Check a reset token before showing the new-password form
async fn validate_reset_token(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<ResetTokenValidation>> {
    Ok(Json(ctx.auth.validate_reset_token(&token).await?))
}

/// Redeem a reset token and set the new password
async fn reset_password_confirm(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordConfirmRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(ctx.auth.confirm_password_reset(req).await?))
}

/// Invalidate the presented token for the rest of its lifetime
async fn signout(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        ctx.auth.signout(&session.raw_token, &session.claims).await?,
    ))
}
