// ABOUTME: Note repository scoped to a workspace: paginated listing, CRUD, soft delete and restore
// ABOUTME: Plain updates bump the version only when the content actually changes

use sea_orm::{
    sea_query::{Expr, Order},
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{note, workspace};
use crate::error::{AppError, Result};
use crate::permissions::Level;
use crate::storage::{self, now_millis, Page, PageRequest, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOrderField {
    CreatedAt,
    UpdatedAt,
    Title,
    Version,
}

impl NoteOrderField {
    pub const ACCEPTED: &'static str = "createdAt, updatedAt, title, version";

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            "version" => Some(Self::Version),
            _ => None,
        }
    }

    fn column(self) -> note::Column {
        match self {
            Self::CreatedAt => note::Column::CreatedAt,
            Self::UpdatedAt => note::Column::UpdatedAt,
            Self::Title => note::Column::Title,
            Self::Version => note::Column::Version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOrder {
    pub field: NoteOrderField,
    pub descending: bool,
}

impl Default for NoteOrder {
    fn default() -> Self {
        Self {
            field: NoteOrderField::CreatedAt,
            descending: true,
        }
    }
}

impl NoteOrder {
    fn direction(self) -> Order {
        if self.descending {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

impl Storage {
    pub async fn list_notes(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        request: PageRequest,
        order: NoteOrder,
    ) -> Result<Page<note::Model>> {
        self.authorize(user_id, workspace_id, Level::Read).await?;

        // Ties on the ordered column fall back to id so pages never overlap.
        let select = storage::live::<note::Entity>()
            .filter(note::Column::WorkspaceId.eq(workspace_id))
            .order_by(order.field.column(), order.direction())
            .order_by(note::Column::Id, order.direction());

        storage::paginate(&self.db, select, request).await
    }

    pub async fn create_note(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        input: NewNote,
    ) -> Result<note::Model> {
        self.authorize(user_id, workspace_id, Level::Write).await?;

        let now = now_millis();
        let note = note::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            title: Set(input.title),
            content: Set(input.content),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(note_id = %note.id, %workspace_id, "Created note");
        Ok(note)
    }

    /// Resolves a live note, then enforces `level` on its workspace.
    /// Existence is decided first so a missing note is always `NotFound`.
    pub async fn note_for(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        level: Level,
    ) -> Result<(note::Model, workspace::Model)> {
        let note = storage::find_live::<note::Entity, _>(&self.db, note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;
        let workspace = self.authorize(user_id, note.workspace_id, level).await?;
        Ok((note, workspace))
    }

    pub async fn get_note(&self, user_id: Uuid, note_id: Uuid) -> Result<note::Model> {
        let (note, _) = self.note_for(user_id, note_id, Level::Read).await?;
        Ok(note)
    }

    /// Partial title/content update outside the diff log. The write is
    /// conditional on the version read beforehand; a concurrent edit makes
    /// it match nothing and the caller gets `Conflict`.
    pub async fn update_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        changes: NoteChanges,
    ) -> Result<note::Model> {
        let (note, _) = self.note_for(user_id, note_id, Level::Write).await?;
        self.write_note_changes(&note, changes).await
    }

    /// Writes `changes` over `note` as it was read, failing with `Conflict`
    /// when the stored version has moved on. Only a content change bumps the
    /// version.
    pub(crate) async fn write_note_changes(
        &self,
        note: &note::Model,
        changes: NoteChanges,
    ) -> Result<note::Model> {
        let content = changes.content.filter(|content| *content != note.content);
        if changes.title.is_none() && content.is_none() {
            return Ok(note.clone());
        }

        let mut update = note::Entity::update_many()
            .col_expr(note::Column::UpdatedAt, Expr::value(now_millis()))
            .filter(note::Column::Id.eq(note.id))
            .filter(note::Column::Version.eq(note.version))
            .filter(note::Column::DeletedAt.is_null());
        if let Some(title) = changes.title {
            update = update.col_expr(note::Column::Title, Expr::value(title));
        }
        let content_changed = content.is_some();
        if let Some(content) = content {
            update = update
                .col_expr(note::Column::Content, Expr::value(content))
                .col_expr(
                    note::Column::Version,
                    Expr::col(note::Column::Version).add(1),
                );
        }

        let result = update.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Note was modified concurrently; reload and retry".to_string(),
            ));
        }

        tracing::info!(note_id = %note.id, content_changed, "Updated note");
        self.reload_note(note.id).await
    }

    pub async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<()> {
        self.note_for(user_id, note_id, Level::Write).await?;
        storage::soft_delete::<note::Entity, _>(&self.db, note_id).await?;

        tracing::info!(%note_id, %user_id, "Deleted note");
        Ok(())
    }

    /// Brings a soft-deleted note back. Only deleted notes can be restored;
    /// the version is left as it was.
    pub async fn restore_note(&self, user_id: Uuid, note_id: Uuid) -> Result<note::Model> {
        let note = storage::find_any::<note::Entity, _>(&self.db, note_id)
            .await?
            .filter(|note| note.deleted_at.is_some())
            .ok_or_else(|| AppError::NotFound("Deleted note not found".to_string()))?;
        self.authorize(user_id, note.workspace_id, Level::Write).await?;

        storage::restore::<note::Entity, _>(&self.db, note_id).await?;
        tracing::info!(%note_id, %user_id, "Restored note");
        self.reload_note(note_id).await
    }

    pub(crate) async fn reload_note(&self, note_id: Uuid) -> Result<note::Model> {
        storage::find_live::<note::Entity, _>(&self.db, note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_fields_parse_camel_case_names() {
        assert_eq!(NoteOrderField::parse("createdAt"), Some(NoteOrderField::CreatedAt));
        assert_eq!(NoteOrderField::parse("version"), Some(NoteOrderField::Version));
        assert_eq!(NoteOrderField::parse("created_at"), None);
        assert_eq!(NoteOrderField::parse("content"), None);
    }

    #[test]
    fn default_order_is_newest_first() {
        let order = NoteOrder::default();
        assert_eq!(order.field, NoteOrderField::CreatedAt);
        assert!(order.descending);
    }
}
