// ABOUTME: Handlers for tags on workspaces and notes
// ABOUTME: A note can only carry tags already made available in its workspace

use axum::{extract::State, response::Response, Json};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::entities::tag;
use crate::error::Result;
use crate::handlers::{deleted, Deleted};
use crate::types::{AddNoteTagRequest, ApiResponse, CreateTagRequest, PathParams, Payload, Validate};
use crate::AppState;

pub async fn list_for_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Vec<tag::Model>>>> {
    let tags = state
        .storage
        .list_workspace_tags(user.id(), workspace_id)
        .await?;
    Ok(ApiResponse::ok(tags))
}

pub async fn create_for_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
    Payload(request): Payload<CreateTagRequest>,
) -> Result<Response> {
    let input = request.validate()?;
    let tag = state
        .storage
        .create_workspace_tag(user.id(), workspace_id, input)
        .await?;
    Ok(ApiResponse::created(tag))
}

pub async fn remove_from_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((workspace_id, tag_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state
        .storage
        .remove_workspace_tag(user.id(), workspace_id, tag_id)
        .await?;
    Ok(deleted(tag_id))
}

pub async fn list_for_note(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Vec<tag::Model>>>> {
    let tags = state.storage.list_note_tags(user.id(), note_id).await?;
    Ok(ApiResponse::ok(tags))
}

pub async fn add_to_note(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
    Payload(request): Payload<AddNoteTagRequest>,
) -> Result<Response> {
    let tag_id = request.validate()?;
    let tag = state.storage.add_note_tag(user.id(), note_id, tag_id).await?;
    Ok(ApiResponse::created(tag))
}

pub async fn remove_from_note(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((note_id, tag_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state
        .storage
        .remove_note_tag(user.id(), note_id, tag_id)
        .await?;
    Ok(deleted(tag_id))
}
