// ABOUTME: Diff/versioning engine applying positional text edits to note content
// ABOUTME: Records each edit as an immutable diff and bumps the version in one transaction

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{diff, note};
use crate::error::{AppError, FieldError, Result};
use crate::permissions::Level;
use crate::storage::{self, now_millis, Page, PageRequest, Storage};

/// A positional edit: replace `length` characters starting at `position`
/// with `new_text`. Offsets count `char`s of the pre-edit content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub position: usize,
    pub length: usize,
    pub new_text: String,
}

/// Computes `content[..position] + new_text + content[position + length..]`.
///
/// Edits reaching past the end of `content` are rejected rather than
/// clamped, so a stale client cannot silently splice text in the wrong place.
pub fn apply_edit(content: &str, edit: &Edit) -> Result<String> {
    let char_len = content.chars().count();

    if edit.position > char_len {
        return Err(AppError::Validation(vec![FieldError::new(
            "position",
            format!(
                "position {} is past the end of the content ({} characters)",
                edit.position, char_len
            ),
            "out_of_range",
        )]));
    }
    let end = edit
        .position
        .checked_add(edit.length)
        .filter(|end| *end <= char_len)
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(
                "length",
                format!(
                    "position {} plus length {} is past the end of the content ({} characters)",
                    edit.position, edit.length, char_len
                ),
                "out_of_range",
            )])
        })?;

    let start_byte = byte_offset(content, edit.position);
    let end_byte = byte_offset(content, end);

    let mut updated =
        String::with_capacity(content.len() - (end_byte - start_byte) + edit.new_text.len());
    updated.push_str(&content[..start_byte]);
    updated.push_str(&edit.new_text);
    updated.push_str(&content[end_byte..]);
    Ok(updated)
}

fn byte_offset(content: &str, chars: usize) -> usize {
    content
        .char_indices()
        .nth(chars)
        .map_or(content.len(), |(offset, _)| offset)
}

impl Storage {
    /// Applies `edit` to a note and logs it.
    ///
    /// Existence, write permission and the client's expected version are
    /// settled before the write; see [`Storage::commit_diff`].
    pub async fn apply_diff(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        edit: Edit,
        expected_version: Option<i32>,
    ) -> Result<(note::Model, diff::Model)> {
        let (note, _) = self.note_for(user_id, note_id, Level::Write).await?;

        if let Some(expected) = expected_version {
            if expected != note.version {
                return Err(AppError::Conflict(format!(
                    "Note is at version {}, edit was made against version {}",
                    note.version, expected
                )));
            }
        }

        self.commit_diff(&note, edit).await
    }

    /// Applies `edit` on top of `note` as it was read. The version check runs
    /// inside the transaction, so a note that moved on since the read rolls
    /// the diff back and fails with `Conflict`.
    pub(crate) async fn commit_diff(
        &self,
        note: &note::Model,
        edit: Edit,
    ) -> Result<(note::Model, diff::Model)> {
        let updated_content = apply_edit(&note.content, &edit)?;
        let position = i64::try_from(edit.position)
            .map_err(|_| AppError::field("position", "position is too large", "out_of_range"))?;
        let length = i64::try_from(edit.length)
            .map_err(|_| AppError::field("length", "length is too large", "out_of_range"))?;

        let note_id = note.id;
        let now = now_millis();
        let txn = self.db.begin().await?;

        let diff = diff::ActiveModel {
            id: Set(Uuid::new_v4()),
            note_id: Set(note_id),
            position: Set(position),
            length: Set(length),
            new_text: Set(edit.new_text),
            applied_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let result = note::Entity::update_many()
            .col_expr(note::Column::Content, Expr::value(updated_content))
            .col_expr(
                note::Column::Version,
                Expr::col(note::Column::Version).add(1),
            )
            .col_expr(note::Column::UpdatedAt, Expr::value(now))
            .filter(note::Column::Id.eq(note_id))
            .filter(note::Column::Version.eq(note.version))
            .filter(note::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            tracing::warn!(%note_id, version = note.version, "Diff lost a concurrent update race");
            return Err(AppError::Conflict(
                "Note was modified concurrently; reload and retry".to_string(),
            ));
        }

        txn.commit().await?;

        tracing::info!(
            %note_id,
            diff_id = %diff.id,
            version = note.version + 1,
            "Applied diff"
        );
        let note = self.reload_note(note_id).await?;
        Ok((note, diff))
    }

    /// The note's edit log in application order.
    pub async fn list_diffs(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<diff::Model>> {
        self.note_for(user_id, note_id, Level::Read).await?;

        let select = storage::live::<diff::Entity>()
            .filter(diff::Column::NoteId.eq(note_id))
            .order_by_asc(diff::Column::AppliedAt)
            .order_by_asc(diff::Column::CreatedAt)
            .order_by_asc(diff::Column::Id);

        storage::paginate(&self.db, select, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn edit(position: usize, length: usize, new_text: &str) -> Edit {
        Edit {
            position,
            length,
            new_text: new_text.to_string(),
        }
    }

    #[test]
    fn replaces_a_word() {
        let updated = apply_edit("Hello world", &edit(6, 5, "there")).unwrap();
        assert_eq!(updated, "Hello there");
    }

    #[test]
    fn pure_insert_keeps_surrounding_text() {
        let content = "abcdef";
        for p in 0..=content.len() {
            let updated = apply_edit(content, &edit(p, 0, "XY")).unwrap();
            assert_eq!(updated, format!("{}XY{}", &content[..p], &content[p..]));
        }
    }

    #[test]
    fn pure_delete_removes_range() {
        let content = "abcdef";
        let updated = apply_edit(content, &edit(1, 3, "")).unwrap();
        assert_eq!(updated, "aef");

        let everything = apply_edit(content, &edit(0, 6, "")).unwrap();
        assert_eq!(everything, "");
    }

    #[test]
    fn insert_into_empty_content() {
        assert_eq!(apply_edit("", &edit(0, 0, "first")).unwrap(), "first");
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let updated = apply_edit("héllo wörld", &edit(6, 5, "there")).unwrap();
        assert_eq!(updated, "héllo there");

        let updated = apply_edit("日本語", &edit(1, 1, "x")).unwrap();
        assert_eq!(updated, "日x語");
    }

    #[test]
    fn position_past_end_is_rejected() {
        let err = apply_edit("short", &edit(6, 0, "x")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        match err {
            AppError::Validation(fields) => assert_eq!(fields[0].path, "position"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn range_past_end_is_rejected() {
        let err = apply_edit("short", &edit(3, 3, "x")).unwrap_err();
        match err {
            AppError::Validation(fields) => assert_eq!(fields[0].path, "length"),
            other => panic!("unexpected error: {other}"),
        }

        let err = apply_edit("short", &edit(1, usize::MAX, "")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn append_at_exact_end_is_allowed() {
        assert_eq!(apply_edit("abc", &edit(3, 0, "d")).unwrap(), "abcd");
    }
}
