/// Notification endpoints under /api/notifications
use crate::{
    api::middleware::AuthSession,
    auth::MessageResponse,
    context::AppContext,
    db::models::Notification,
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

pub fn session_routes() -> Router<AppContext> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route(
            "/api/notifications/:notification_id/read",
            post(mark_notification_read),
        )
}

#[derive(Debug, Serialize)]
struct ListNotificationsResponse {
    notifications: Vec<Notification>,
}

/// Newest-first list of the calling user's notifications
async fn list_notifications(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ListNotificationsResponse>> {
    let notifications = ctx.notifier.list_for_user(&session.user.user_id).await?;
    Ok(Json(ListNotificationsResponse { notifications }))
}

async fn mark_notification_read(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.notifier
        .mark_read(&notification_id, &session.user.user_id)
        .await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}
