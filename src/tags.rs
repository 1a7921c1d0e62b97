// ABOUTME: Tag association service for workspace-to-tag and note-to-tag joins
// ABOUTME: Tags are shared by name; a tag applies to a note only once it is available in the workspace

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{note, note_tag, tag, workspace_tag};
use crate::error::{AppError, Result};
use crate::permissions::Level;
use crate::storage::{self, now_millis, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub display_name: String,
}

async fn workspace_has_tag<C: ConnectionTrait>(
    db: &C,
    workspace_id: Uuid,
    tag_id: Uuid,
) -> Result<bool> {
    Ok(workspace_tag::Entity::find_by_id((workspace_id, tag_id))
        .one(db)
        .await?
        .is_some())
}

impl Storage {
    /// Makes a tag available in a workspace, creating the tag row first when
    /// no tag with that name exists yet. Both rows commit together.
    pub async fn create_workspace_tag(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        input: NewTag,
    ) -> Result<tag::Model> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        let now = now_millis();
        let txn = self.db.begin().await?;

        let existing = storage::live::<tag::Entity>()
            .filter(tag::Column::Name.eq(input.name.as_str()))
            .one(&txn)
            .await?;
        let tag = match existing {
            Some(tag) => tag,
            None => {
                tag::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(input.name),
                    display_name: Set(input.display_name),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(&txn)
                .await?
            }
        };

        if workspace_has_tag(&txn, workspace_id, tag.id).await? {
            return Err(AppError::Conflict(format!(
                "Tag '{}' is already available in this workspace",
                tag.name
            )));
        }

        workspace_tag::ActiveModel {
            workspace_id: Set(workspace_id),
            tag_id: Set(tag.id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(tag_id = %tag.id, %workspace_id, "Added tag to workspace");
        Ok(tag)
    }

    pub async fn list_workspace_tags(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Vec<tag::Model>> {
        self.authorize(user_id, workspace_id, Level::Read).await?;

        Ok(storage::live::<tag::Entity>()
            .inner_join(workspace_tag::Entity)
            .filter(workspace_tag::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Withdraws a tag from a workspace, taking it off every note there too.
    pub async fn remove_workspace_tag(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        tag_id: Uuid,
    ) -> Result<()> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        let txn = self.db.begin().await?;

        let notes_in_workspace = note::Entity::find()
            .select_only()
            .column(note::Column::Id)
            .filter(note::Column::WorkspaceId.eq(workspace_id))
            .into_query();
        note_tag::Entity::delete_many()
            .filter(note_tag::Column::TagId.eq(tag_id))
            .filter(note_tag::Column::NoteId.in_subquery(notes_in_workspace))
            .exec(&txn)
            .await?;

        let removed = workspace_tag::Entity::delete_by_id((workspace_id, tag_id))
            .exec(&txn)
            .await?;
        if removed.rows_affected == 0 {
            return Err(AppError::NotFound(
                "Tag is not available in this workspace".to_string(),
            ));
        }

        txn.commit().await?;

        tracing::info!(%tag_id, %workspace_id, "Removed tag from workspace");
        Ok(())
    }

    pub async fn add_note_tag(&self, user_id: Uuid, note_id: Uuid, tag_id: Uuid) -> Result<tag::Model> {
        let (note, _) = self.note_for(user_id, note_id, Level::Write).await?;

        let tag = storage::find_live::<tag::Entity, _>(&self.db, tag_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
        if !workspace_has_tag(&self.db, note.workspace_id, tag_id).await? {
            return Err(AppError::NotFound(
                "Tag is not available in this note's workspace".to_string(),
            ));
        }

        if note_tag::Entity::find_by_id((note_id, tag_id))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Note is already tagged '{}'",
                tag.name
            )));
        }

        note_tag::ActiveModel {
            note_id: Set(note_id),
            tag_id: Set(tag_id),
            created_at: Set(now_millis()),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(%note_id, %tag_id, "Tagged note");
        Ok(tag)
    }

    pub async fn remove_note_tag(&self, user_id: Uuid, note_id: Uuid, tag_id: Uuid) -> Result<()> {
        self.note_for(user_id, note_id, Level::Write).await?;

        let removed = note_tag::Entity::delete_by_id((note_id, tag_id))
            .exec(&self.db)
            .await?;
        if removed.rows_affected == 0 {
            return Err(AppError::NotFound("Note does not carry this tag".to_string()));
        }

        tracing::info!(%note_id, %tag_id, "Untagged note");
        Ok(())
    }

    pub async fn list_note_tags(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<tag::Model>> {
        self.note_for(user_id, note_id, Level::Read).await?;

        Ok(storage::live::<tag::Entity>()
            .inner_join(note_tag::Entity)
            .filter(note_tag::Column::NoteId.eq(note_id))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?)
    }
}
