/// Rate Limiting System
use crate::config::RateLimitConfig;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Three in-process buckets: admin traffic, authenticated traffic, and
/// everything else. Keyless on purpose, this protects the service as a
/// whole rather than fairness between callers.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    unauthenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    admin: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let auth_quota = Quota::per_second(
            NonZeroU32::new(config.authenticated_rps).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(50).unwrap()));

        let unauth_quota = Quota::per_second(
            NonZeroU32::new(config.unauthenticated_rps).unwrap_or(NonZeroU32::new(10).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 5).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        let admin_quota = Quota::per_second(
            NonZeroU32::new(config.admin_rps).unwrap_or(NonZeroU32::new(1000).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size * 2).unwrap_or(NonZeroU32::new(100).unwrap()),
        );

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
            admin: Arc::new(GovernorLimiter::direct(admin_quota)),
        }
    }

    /// Check rate limit for authenticated traffic
    pub fn check_authenticated(&self) -> ApiResult<()> {
        if !self.enabled {
            return Ok(());
        }
        match self.authenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ApiError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    /// Check rate limit for unauthenticated traffic
    pub fn check_unauthenticated(&self) -> ApiResult<()> {
        if !self.enabled {
            return Ok(());
        }
        match self.unauthenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ApiError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    /// Check rate limit for admin traffic
    pub fn check_admin(&self) -> ApiResult<()> {
        if !self.enabled {
            return Ok(());
        }
        match self.admin.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ApiError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }
}

/// Rate limiting middleware
///
/// The bucket is picked before authentication runs, so the signal is
/// the path prefix plus Authorization header presence, not a verified
/// session.
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let is_admin = request.uri().path().starts_with("/api/admin");
    let has_auth_header = request.headers().get("authorization").is_some();

    if is_admin && has_auth_header {
        ctx.rate_limiter.check_admin()?;
    } else if has_auth_header {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}
