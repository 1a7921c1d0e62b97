// ABOUTME: Directed note-to-note link service with positional ordering on the source note
// ABOUTME: Needs write access on the source workspace and read access on the target workspace

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use uuid::Uuid;

use crate::entities::{link, note, workspace};
use crate::error::{AppError, Result};
use crate::permissions::{readable_workspace_ids, Level};
use crate::storage::{self, now_millis, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub source_note_id: Uuid,
    pub target_note_id: Uuid,
    pub link_text: String,
    pub position: i32,
}

pub fn self_link_error() -> AppError {
    AppError::field(
        "targetNoteId",
        "a note cannot link to itself",
        "self_link",
    )
}

impl Storage {
    pub async fn create_link(&self, user_id: Uuid, input: NewLink) -> Result<link::Model> {
        if input.source_note_id == input.target_note_id {
            return Err(self_link_error());
        }

        let source = storage::find_live::<note::Entity, _>(&self.db, input.source_note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Source note not found".to_string()))?;
        let target = storage::find_live::<note::Entity, _>(&self.db, input.target_note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Target note not found".to_string()))?;

        self.authorize(user_id, source.workspace_id, Level::Write).await?;
        self.authorize(user_id, target.workspace_id, Level::Read).await?;

        // The unique index covers soft-deleted rows too, so a link removed
        // earlier at the same slot is revived instead of inserted.
        let existing = link::Entity::find()
            .filter(link::Column::SourceNoteId.eq(source.id))
            .filter(link::Column::TargetNoteId.eq(target.id))
            .filter(link::Column::Position.eq(input.position))
            .one(&self.db)
            .await?;

        let now = now_millis();
        let link = match existing {
            Some(row) if row.deleted_at.is_none() => {
                return Err(AppError::Conflict(format!(
                    "A link to this note already exists at position {}",
                    input.position
                )));
            }
            Some(row) => {
                let mut active: link::ActiveModel = row.into();
                active.link_text = Set(input.link_text);
                active.deleted_at = Set(None);
                active.updated_at = Set(now);
                active.update(&self.db).await?
            }
            None => {
                link::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    source_note_id: Set(source.id),
                    target_note_id: Set(target.id),
                    link_text: Set(input.link_text),
                    position: Set(input.position),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(&self.db)
                .await?
            }
        };

        tracing::info!(link_id = %link.id, source = %source.id, target = %target.id, "Created link");
        Ok(link)
    }

    pub async fn delete_link(&self, user_id: Uuid, link_id: Uuid) -> Result<()> {
        let link = storage::find_live::<link::Entity, _>(&self.db, link_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;
        self.note_for(user_id, link.source_note_id, Level::Write).await?;

        storage::soft_delete::<link::Entity, _>(&self.db, link_id).await?;
        tracing::info!(%link_id, %user_id, "Deleted link");
        Ok(())
    }

    /// Outgoing links of a note, ordered by position. Links whose target is
    /// deleted, or sits in a workspace the caller cannot read, are left out.
    pub async fn list_links(&self, user_id: Uuid, note_id: Uuid) -> Result<Vec<link::Model>> {
        self.note_for(user_id, note_id, Level::Read).await?;

        Ok(storage::live::<link::Entity>()
            .join(JoinType::InnerJoin, link::Relation::Target.def())
            .join(JoinType::InnerJoin, note::Relation::Workspace.def())
            .filter(link::Column::SourceNoteId.eq(note_id))
            .filter(note::Column::DeletedAt.is_null())
            .filter(workspace::Column::DeletedAt.is_null())
            .filter(note::Column::WorkspaceId.in_subquery(readable_workspace_ids(user_id)))
            .order_by_asc(link::Column::Position)
            .order_by_asc(link::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
