// ABOUTME: Workspace-scoped permission service deciding read and write access per user
// ABOUTME: A live permission row is the only source of access; existence is checked before access

use sea_orm::{
    sea_query::SelectStatement, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{permission, workspace};
use crate::error::{AppError, Result};
use crate::storage::{self, now_millis, Storage};

/// Outcome of looking up a user's permission row for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub has_permission: bool,
    pub can_write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Read,
    Write,
}

impl Access {
    pub const NONE: Access = Access {
        has_permission: false,
        can_write: false,
    };

    pub fn allows(self, level: Level) -> bool {
        match level {
            Level::Read => self.has_permission,
            Level::Write => self.has_permission && self.can_write,
        }
    }
}

/// Finds the row for `workspace_id` among a user's live permissions.
pub fn access_among(permissions: &[permission::Model], workspace_id: Uuid) -> Access {
    permissions
        .iter()
        .find(|p| p.workspace_id == workspace_id && p.deleted_at.is_none())
        .map(|p| Access {
            has_permission: true,
            can_write: p.can_write,
        })
        .unwrap_or(Access::NONE)
}

/// Subquery selecting the ids of workspaces `user_id` holds a live permission on.
pub fn readable_workspace_ids(user_id: Uuid) -> SelectStatement {
    permission::Entity::find()
        .select_only()
        .column(permission::Column::WorkspaceId)
        .filter(permission::Column::UserId.eq(user_id))
        .filter(permission::Column::DeletedAt.is_null())
        .into_query()
}

/// Refuses to leave a workspace without any writer.
async fn ensure_other_writer<C: ConnectionTrait>(
    db: &C,
    workspace_id: Uuid,
    excluding: Uuid,
) -> Result<()> {
    let writers = storage::live::<permission::Entity>()
        .filter(permission::Column::WorkspaceId.eq(workspace_id))
        .filter(permission::Column::CanWrite.eq(true))
        .filter(permission::Column::UserId.ne(excluding))
        .count(db)
        .await?;

    if writers == 0 {
        return Err(AppError::Conflict(
            "A workspace must keep at least one writer".to_string(),
        ));
    }
    Ok(())
}

impl Storage {
    pub async fn permissions_for_user(&self, user_id: Uuid) -> Result<Vec<permission::Model>> {
        Ok(storage::live::<permission::Entity>()
            .filter(permission::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?)
    }

    pub async fn check_access(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Access> {
        let permissions = self.permissions_for_user(user_id).await?;
        Ok(access_among(&permissions, workspace_id))
    }

    /// Loads a live workspace and enforces `level` for `user_id` on it.
    ///
    /// A missing or soft-deleted workspace is `NotFound` whatever the caller's
    /// permissions; a live one the caller lacks access to is `Forbidden`.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        level: Level,
    ) -> Result<workspace::Model> {
        let workspace = storage::find_live::<workspace::Entity, _>(&self.db, workspace_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Workspace not found".to_string()))?;

        let access = self.check_access(workspace_id, user_id).await?;
        if !access.allows(level) {
            tracing::warn!(%user_id, %workspace_id, ?level, "Access denied");
            let message = match level {
                Level::Read => "No access to this workspace",
                Level::Write => "Write access to this workspace is required",
            };
            return Err(AppError::Forbidden(message.to_string()));
        }

        Ok(workspace)
    }

    pub async fn list_workspace_permissions(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Vec<permission::Model>> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        Ok(storage::live::<permission::Entity>()
            .filter(permission::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(permission::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Grants `target_user_id` access to a workspace, or changes the level of
    /// an existing grant. A previously revoked row is revived in place since
    /// the (user, workspace) pair is unique.
    pub async fn grant_permission(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        target_user_id: Uuid,
        can_write: bool,
    ) -> Result<permission::Model> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        if self.find_user(target_user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        // The writer check and the write commit together.
        let txn = self.db.begin().await?;
        let existing = permission::Entity::find()
            .filter(permission::Column::UserId.eq(target_user_id))
            .filter(permission::Column::WorkspaceId.eq(workspace_id))
            .one(&txn)
            .await?;

        let now = now_millis();
        let permission = match existing {
            Some(row) => {
                if row.deleted_at.is_none() && row.can_write && !can_write {
                    ensure_other_writer(&txn, workspace_id, target_user_id).await?;
                }
                let mut active: permission::ActiveModel = row.into();
                active.can_write = Set(can_write);
                active.deleted_at = Set(None);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                permission::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(target_user_id),
                    workspace_id: Set(workspace_id),
                    can_write: Set(can_write),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(&txn)
                .await?
            }
        };
        txn.commit().await?;

        tracing::info!(%workspace_id, %target_user_id, can_write, "Granted permission");
        Ok(permission)
    }

    pub async fn revoke_permission(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<()> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        let txn = self.db.begin().await?;
        let row = storage::live::<permission::Entity>()
            .filter(permission::Column::UserId.eq(target_user_id))
            .filter(permission::Column::WorkspaceId.eq(workspace_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Permission not found".to_string()))?;

        if row.can_write {
            ensure_other_writer(&txn, workspace_id, target_user_id).await?;
        }

        storage::soft_delete::<permission::Entity, _>(&txn, row.id).await?;
        txn.commit().await?;
        tracing::info!(%workspace_id, %target_user_id, "Revoked permission");
        Ok(())
    }
}
