// ABOUTME: Handlers for workspaces and their permission rows
// ABOUTME: Listing is limited to workspaces the caller holds a permission on

use axum::{extract::State, response::Response, Json};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::entities::{permission, workspace};
use crate::error::Result;
use crate::handlers::{deleted, Deleted};
use crate::types::{
    ApiResponse, CreateWorkspaceRequest, GrantPermissionRequest, ListQuery, PaginatedResponse,
    PathParams, Payload, QueryParams, UpdateWorkspaceRequest, Validate,
};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<PaginatedResponse<workspace::Model>> {
    let request = query.page_request(&state.config)?;
    let page = state.storage.list_workspaces(user.id(), request).await?;
    Ok(page.into())
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Payload(request): Payload<CreateWorkspaceRequest>,
) -> Result<Response> {
    let input = request.validate()?;
    let workspace = state.storage.create_workspace(user.id(), input).await?;
    Ok(ApiResponse::created(workspace))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<workspace::Model>>> {
    let workspace = state.storage.get_workspace(user.id(), workspace_id).await?;
    Ok(ApiResponse::ok(workspace))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
    Payload(request): Payload<UpdateWorkspaceRequest>,
) -> Result<Json<ApiResponse<workspace::Model>>> {
    let changes = request.validate()?;
    let workspace = state
        .storage
        .update_workspace(user.id(), workspace_id, changes)
        .await?;
    Ok(ApiResponse::ok(workspace))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state.storage.delete_workspace(user.id(), workspace_id).await?;
    Ok(deleted(workspace_id))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Vec<permission::Model>>>> {
    let permissions = state
        .storage
        .list_workspace_permissions(user.id(), workspace_id)
        .await?;
    Ok(ApiResponse::ok(permissions))
}

pub async fn grant_permission(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
    Payload(request): Payload<GrantPermissionRequest>,
) -> Result<Json<ApiResponse<permission::Model>>> {
    let (target_user_id, can_write) = request.validate()?;
    let permission = state
        .storage
        .grant_permission(user.id(), workspace_id, target_user_id, can_write)
        .await?;
    Ok(ApiResponse::ok(permission))
}

pub async fn revoke_permission(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((workspace_id, target_user_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state
        .storage
        .revoke_permission(user.id(), workspace_id, target_user_id)
        .await?;
    Ok(deleted(target_user_id))
}
