// ABOUTME: Bearer credential authentication: resolves an API key to the calling user
// ABOUTME: Runs as route middleware so handlers only ever see an already-resolved user

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};

use crate::entities::user;
use crate::error::AppError;
use crate::AppState;

const API_KEY_BYTES: usize = 32;
const API_KEY_PREFIX: &str = "nsk_";

/// The authenticated caller, inserted into request extensions by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }
}

pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

pub async fn require_user(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Unauthorized("Missing bearer credential".to_string()))?;

    let user = state
        .storage
        .find_user_by_api_key(bearer.token())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credential".to_string()))?;

    tracing::debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_prefixed_and_unique() {
        let first = generate_api_key();
        let second = generate_api_key();

        assert!(first.starts_with(API_KEY_PREFIX));
        assert_eq!(first.len(), API_KEY_PREFIX.len() + 43);
        assert_ne!(first, second);
    }
}
