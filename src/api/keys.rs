/// API key endpoints under /api/api-keys
use crate::{
    api::middleware::AuthSession,
    auth::MessageResponse,
    context::AppContext,
    db::models::ApiKey,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn session_routes() -> Router<AppContext> {
    Router::new()
        .route("/api/api-keys", get(list_api_keys))
        .route("/api/api-keys", post(create_api_key))
        .route("/api/api-keys/:key_id", delete(delete_api_key))
}

#[derive(Debug, Deserialize)]
struct CreateApiKeyRequest {
    name: String,
}

/// The raw secret appears only in this response; listings never
/// serialize the stored value
#[derive(Debug, Serialize)]
struct CreateApiKeyResponse {
    #[serde(flatten)]
    key: ApiKey,
    api_key: String,
}

async fn create_api_key(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Key name is required".to_string()));
    }

    let (key, raw) = ctx
        .api_keys
        .create_key(&session.user.account_id, &session.user.user_id, name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse { key, api_key: raw }),
    ))
}

#[derive(Debug, Serialize)]
struct ListApiKeysResponse {
    api_keys: Vec<ApiKey>,
}

async fn list_api_keys(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ListApiKeysResponse>> {
    let api_keys = ctx.api_keys.list_keys(&session.user.account_id).await?;
    Ok(Json(ListApiKeysResponse { api_keys }))
}

async fn delete_api_key(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(key_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.api_keys
        .delete_key(&key_id, &session.user.account_id)
        .await?;
    Ok(Json(MessageResponse::new("API key deleted successfully")))
}
