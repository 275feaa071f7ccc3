use crate::{
    auth::AuthenticatedUser,
    error::{ApiError, ApiResult, ErrorResponse},
    state::AppState,
    validation::{validate_create_workspace, CreateWorkspaceBody},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use workspaces_orchestrator::Workspace;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/workspaces", get(list_workspaces).post(create_workspace))
}

/// Get all workspaces the current user is a member of
#[utoipa::path(
    get,
    path = "/api/workspaces",
    tag = "workspaces-api",
    responses(
        (status = 200, description = "Workspaces of the current user", body = [Workspace]),
        (status = 401, description = "Missing session", body = ErrorResponse)
    )
)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<Workspace>>> {
    let workspaces = state.orchestrator.list_workspaces(&user.id).await?;

    Ok(Json(workspaces))
}

/// Create a workspace owned by the current user
#[utoipa::path(
    post,
    path = "/api/workspaces",
    tag = "workspaces-api",
    request_body = CreateWorkspaceBody,
    responses(
        (status = 200, description = "Workspace created", body = Workspace),
        (status = 403, description = "Free workspace limit reached", body = ErrorResponse),
        (status = 404, description = "Session user no longer exists", body = ErrorResponse),
        (status = 409, description = "Slug or domain already in use", body = ErrorResponse),
        (status = 422, description = "Invalid request body", body = ErrorResponse)
    )
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateWorkspaceBody>, JsonRejection>,
) -> ApiResult<Json<Workspace>> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let req = validate_create_workspace(body)?;

    let workspace = state.orchestrator.create_workspace(&user.id, req).await?;

    Ok(Json(workspace))
}
