// ABOUTME: Workspace operations: whitelist listing, creation with a founding permission, update, delete
// ABOUTME: Creation writes the workspace and its creator's write permission in one transaction

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{permission, workspace};
use crate::error::Result;
use crate::permissions::{readable_workspace_ids, Level};
use crate::storage::{self, now_millis, Page, PageRequest, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkspace {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl Storage {
    /// Lists the workspaces `user_id` holds a live permission on. The filter is
    /// a subquery on the permission table, applied before pagination.
    pub async fn list_workspaces(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<workspace::Model>> {
        let select = storage::live::<workspace::Entity>()
            .filter(workspace::Column::Id.in_subquery(readable_workspace_ids(user_id)))
            .order_by_desc(workspace::Column::CreatedAt)
            .order_by_asc(workspace::Column::Id);

        storage::paginate(&self.db, select, request).await
    }

    pub async fn create_workspace(
        &self,
        user_id: Uuid,
        input: NewWorkspace,
    ) -> Result<workspace::Model> {
        let now = now_millis();
        let txn = self.db.begin().await?;

        let workspace = workspace::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            workspace_id: Set(workspace.id),
            can_write: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(workspace_id = %workspace.id, %user_id, "Created workspace");
        Ok(workspace)
    }

    pub async fn get_workspace(&self, user_id: Uuid, workspace_id: Uuid) -> Result<workspace::Model> {
        self.authorize(user_id, workspace_id, Level::Read).await
    }

    pub async fn update_workspace(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        changes: WorkspaceChanges,
    ) -> Result<workspace::Model> {
        let workspace = self.authorize(user_id, workspace_id, Level::Write).await?;

        let mut active: workspace::ActiveModel = workspace.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        active.updated_at = Set(now_millis());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_workspace(&self, user_id: Uuid, workspace_id: Uuid) -> Result<()> {
        self.authorize(user_id, workspace_id, Level::Write).await?;
        storage::soft_delete::<workspace::Entity, _>(&self.db, workspace_id).await?;

        tracing::info!(%workspace_id, %user_id, "Deleted workspace");
        Ok(())
    }
}
