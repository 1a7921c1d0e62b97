// ABOUTME: Handlers for user registration and the authenticated caller's profile
// ABOUTME: Registration is the only unauthenticated write endpoint

use axum::{extract::State, response::Response, Json};

use crate::auth::CurrentUser;
use crate::entities::user;
use crate::error::Result;
use crate::types::{ApiResponse, CreateUserRequest, Payload, RegisteredUser, Validate};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Payload(request): Payload<CreateUserRequest>,
) -> Result<Response> {
    let name = request.validate()?;
    let user = state.storage.create_user(name).await?;

    Ok(ApiResponse::created(RegisteredUser {
        api_key: user.api_key.clone(),
        user,
    }))
}

pub async fn me(current: CurrentUser) -> Json<ApiResponse<user::Model>> {
    ApiResponse::ok(current.0)
}
