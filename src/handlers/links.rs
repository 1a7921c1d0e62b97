// ABOUTME: Handlers for directed note links
// ABOUTME: Self-links are rejected during validation, before any lookup

use axum::{extract::State, response::Response, Json};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::entities::link;
use crate::error::Result;
use crate::handlers::{deleted, Deleted};
use crate::types::{ApiResponse, CreateLinkRequest, PathParams, Payload, Validate};
use crate::AppState;

pub async fn list_for_note(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(note_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Vec<link::Model>>>> {
    let links = state.storage.list_links(user.id(), note_id).await?;
    Ok(ApiResponse::ok(links))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Payload(request): Payload<CreateLinkRequest>,
) -> Result<Response> {
    let input = request.validate()?;
    let link = state.storage.create_link(user.id(), input).await?;
    Ok(ApiResponse::created(link))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(link_id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    state.storage.delete_link(user.id(), link_id).await?;
    Ok(deleted(link_id))
}
