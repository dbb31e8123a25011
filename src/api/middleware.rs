/// Authentication and authorization middleware
///
/// The authorization gate for every protected endpoint, in fixed order:
/// bearer extraction, signature/expiry verification, blacklist lookup,
/// revocation-epoch comparison, user and account load, then the shared
/// suspension policy. Handlers downstream read the inserted AuthSession.
use crate::{
    context::AppContext,
    db::models::{Account, Role, User},
    error::{ApiError, ApiResult},
    policy, revocation,
    tokens::{self, Claims},
};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Authenticated request state inserted into request extensions
#[derive(Clone)]
pub struct AuthSession {
    pub user: User,
    pub account: Account,
    pub claims: Claims,
    pub raw_token: String,
}

/// Pull the raw bearer token out of the Authorization header
fn bearer_from_headers(headers: &HeaderMap) -> ApiResult<&str> {
    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;
    tokens::extract_bearer(header)
}

/// Authenticate the request and insert an AuthSession, or reject it.
/// Admin users pass the suspension gate regardless of account state.
pub async fn authenticate(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw_token = bearer_from_headers(req.headers())?.to_string();
    let claims = ctx.tokens.verify(&raw_token)?;

    if ctx.revocation.is_revoked(&raw_token).await? {
        crate::metrics::record_auth_rejection("blacklist");
        return Err(ApiError::Unauthorized(
            "Token has been invalidated".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?1")
        .bind(&claims.user_id)
        .fetch_optional(&ctx.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = ?1")
        .bind(&user.account_id)
        .fetch_optional(&ctx.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    // Tokens minted before either revocation epoch are dead, even though
    // their signature still verifies
    if revocation::issued_before(claims.iat, user.tokens_valid_after)
        || revocation::issued_before(claims.iat, account.tokens_valid_after)
    {
        crate::metrics::record_auth_rejection("epoch");
        return Err(ApiError::Unauthorized(
            "Token has been invalidated".to_string(),
        ));
    }

    if !policy::suspension_allows(&user, &account) {
        crate::metrics::record_auth_rejection("suspended");
        return Err(policy::suspension_denial(&user, &account));
    }

    req.extensions_mut().insert(AuthSession {
        user,
        account,
        claims,
        raw_token,
    });

    Ok(next.run(req).await)
}

/// Gate for admin-only routes; layered inside `authenticate`
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let session = req
        .extensions()
        .get::<AuthSession>()
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    if session.user.role != Role::Admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}
