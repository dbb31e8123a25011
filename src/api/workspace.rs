/// Project and sandbox endpoints under /api/projects and /api/sandboxes
use crate::{
    api::middleware::AuthSession,
    auth::MessageResponse,
    context::AppContext,
    db::models::{Project, Sandbox},
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
        .route("/api/projects", get(list_projects))
        .route("/api/projects", post(create_project))
        .route("/api/projects/:project_id", get(get_project))
        .route("/api/projects/:project_id", delete(delete_project))
        .route("/api/sandboxes", get(list_sandboxes))
        .route("/api/sandboxes", post(create_sandbox))
        .route("/api/sandboxes/:sandbox_id", get(get_sandbox))
        .route("/api/sandboxes/:sandbox_id", delete(delete_sandbox))
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    name: String,
    description: Option<String>,
}

async fn create_project(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = ctx
        .workspace
        .create_project(
            &session.user.account_id,
            &session.user.user_id,
            req.name.trim(),
            req.description.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Debug, Serialize)]
struct ListProjectsResponse {
    projects: Vec<Project>,
}

async fn list_projects(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ListProjectsResponse>> {
    let projects = ctx.workspace.list_projects(&session.user.account_id).await?;
    Ok(Json(ListProjectsResponse { projects }))
}

async fn get_project(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = ctx
        .workspace
        .get_project(&project_id, &session.user.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

async fn delete_project(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.workspace
        .delete_project(&project_id, &session.user.account_id)
        .await?;
    Ok(Json(MessageResponse::new("Project deleted successfully")))
}

#[derive(Debug, Deserialize)]
struct CreateSandboxRequest {
    name: String,
    project_id: Option<String>,
    template: Option<String>,
}

async fn create_sandbox(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateSandboxRequest>,
) -> ApiResult<(StatusCode, Json<Sandbox>)> {
    let sandbox = ctx
        .workspace
        .create_sandbox(
            &session.user.account_id,
            &session.user.user_id,
            req.project_id.as_deref(),
            req.name.trim(),
            req.template.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(sandbox)))
}

#[derive(Debug, Serialize)]
struct ListSandboxesResponse {
    sandboxes: Vec<Sandbox>,
}

async fn list_sandboxes(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
) -> ApiResult<Json<ListSandboxesResponse>> {
    let sandboxes = ctx
        .workspace
        .list_sandboxes(&session.user.account_id)
        .await?;
    Ok(Json(ListSandboxesResponse { sandboxes }))
}

async fn get_sandbox(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(sandbox_id): Path<String>,
) -> ApiResult<Json<Sandbox>> {
    let sandbox = ctx
        .workspace
        .get_sandbox(&sandbox_id, &session.user.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sandbox not found".to_string()))?;
    Ok(Json(sandbox))
}

async fn delete_sandbox(
    State(ctx): State<AppContext>,
    Extension(session): Extension<AuthSession>,
    Path(sandbox_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.workspace
        .delete_sandbox(&sandbox_id, &session.user.account_id)
        .await?;
    Ok(Json(MessageResponse::new("Sandbox deleted successfully")))
}
