/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod keys;
pub mod middleware;
pub mod notifications;
pub mod users;
pub mod workspace;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
///
/// Three tiers: public endpoints, session endpoints behind the bearer
/// gate, and admin endpoints behind the gate plus the role check.
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    let public = Router::new().merge(auth::routes()).merge(users::routes());

    let session = Router::new()
        .merge(auth::session_routes())
        .merge(users::session_routes())
        .merge(workspace::session_routes())
        .merge(notifications::session_routes())
        .merge(keys::session_routes())
        .layer(axum::middleware::from_fn_with_state(
            ctx.clone(),
            middleware::authenticate,
        ));

    // Outermost layer runs first: authenticate, then the role check
    let admin = admin::admin_routes()
        .layer(axum::middleware::from_fn(middleware::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            ctx,
            middleware::authenticate,
        ));

    Router::new().merge(public).merge(session).merge(admin)
}
