// ABOUTME: HTTP handlers, one plain-function module per resource
// ABOUTME: Handlers validate input, call the storage services and shape the envelope

pub mod links;
pub mod notes;
pub mod tags;
pub mod users;
pub mod workspaces;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::types::ApiResponse;

/// Body returned by every delete and revoke endpoint.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

pub fn deleted(id: Uuid) -> Json<ApiResponse<Deleted>> {
    ApiResponse::ok(Deleted { id, deleted: true })
}

pub async fn health() -> Json<ApiResponse<Value>> {
    ApiResponse::ok(json!({ "status": "ok" }))
}
