// ABOUTME: User registration and bearer credential lookup
// ABOUTME: Credentials are generated server-side and returned to the caller exactly once

use sea_orm::{ActiveModelTrait, ColumnTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::auth::generate_api_key;
use crate::entities::user;
use crate::error::Result;
use crate::storage::{self, now_millis, Storage};

impl Storage {
    pub async fn create_user(&self, name: String) -> Result<user::Model> {
        let now = now_millis();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            api_key: Set(generate_api_key()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        Ok(storage::find_live::<user::Entity, _>(&self.db, user_id).await?)
    }

    pub async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<user::Model>> {
        Ok(storage::live::<user::Entity>()
            .filter(user::Column::ApiKey.eq(api_key))
            .one(&self.db)
            .await?)
    }
}
