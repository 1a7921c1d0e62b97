// ABOUTME: Handlers for notes: workspace-scoped listing and creation, CRUD, restore and diffs
// ABOUTME: Diff application responds with both the updated note and the recorded diff

use axum::{extract::State, response::Response, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::entities::{diff, note};
use crate::error::Result;
use crate::handlers::{deleted, Deleted};
use crate::types::{
    ApiResponse, ApplyDiffRequest, CreateNoteRequest, ListQuery, PaginatedResponse, PathParams,
    Payload, QueryParams, UpdateNoteRequest, Validate,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AppliedDiff {
    pub note: note::Model,
    pub diff: diff::Model,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<PaginatedResponse<note::Model>> {
    let request = query.page_request(&state.config)?;
    let order = query.note_order()?;
    let page = state
        .storage
        .list_notes(user.id(), workspace_id, request, order)
        .await?;
    Ok(page.into())
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(workspace_id): PathParams<Uuid>,
    Payload(request): Payload<CreateNoteRequest>,
) -> Result<Response> {
    let input = request.validate()?;
    let note = state
        .storage
        .create_note(user.id(), workspace_id, input)
        .await?;
    Ok(ApiResponse::created(note))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<note::Model>>> {
    let note = state.storage.get_note(user.id(), note_id).await?;
    Ok(ApiResponse::ok(note))
}

/// Serves both PUT and PATCH; absent fields are left as they are.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
    Payload(request): Payload<UpdateNoteRequest>,
) -> Result<Json<ApiResponse<note::Model>>> {
    let changes = request.validate()?;
    let note = state.storage.update_note(user.id(), note_id, changes).await?;
    Ok(ApiResponse::ok(note))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state.storage.delete_note(user.id(), note_id).await?;
    Ok(deleted(note_id))
}

pub async fn restore(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<note::Model>>> {
    let note = state.storage.restore_note(user.id(), note_id).await?;
    Ok(ApiResponse::ok(note))
}

pub async fn list_diffs(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<PaginatedResponse<diff::Model>> {
    let request = query.page_request(&state.config)?;
    let page = state.storage.list_diffs(user.id(), note_id, request).await?;
    Ok(page.into())
}

pub async fn apply_diff(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
    Payload(request): Payload<ApplyDiffRequest>,
) -> Result<Response> {
    let (edit, expected_version) = request.validate()?;
    let (note, diff) = state
        .storage
        .apply_diff(user.id(), note_id, edit, expected_version)
        .await?;
    Ok(ApiResponse::created(AppliedDiff { note, diff }))
}
