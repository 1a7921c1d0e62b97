// ABOUTME: SeaORM entities module for database models and relationships
// ABOUTME: Exports entity definitions for users, workspaces, permissions, notes, diffs, tags and links

pub mod diff;
pub mod link;
pub mod note;
pub mod note_tag;
pub mod permission;
pub mod tag;
pub mod user;
pub mod workspace;
pub mod workspace_tag;

/// Wires an entity with the standard `id`/`updated_at`/`deleted_at` columns
/// into the generic soft-delete repository helpers.
macro_rules! soft_deletable {
    ($entity:ty) => {
        impl crate::storage::SoftDelete for $entity {
            fn id_column() -> Self::Column {
                Column::Id
            }

            fn updated_at_column() -> Self::Column {
                Column::UpdatedAt
            }

            fn deleted_at_column() -> Self::Column {
                Column::DeletedAt
            }
        }
    };
}

pub(crate) use soft_deletable;
