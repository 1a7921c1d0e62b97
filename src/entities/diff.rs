// ABOUTME: Diff entity recording one positional edit applied to a note's content
// ABOUTME: Rows are append-only: written once inside the apply transaction, never updated

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "diffs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub note_id: Uuid,
    /// Character offset into the content as it was before this edit.
    pub position: i64,
    /// Number of characters replaced; zero for a pure insert.
    pub length: i64,
    #[sea_orm(column_type = "Text")]
    pub new_text: String,
    /// `None` means recorded but not yet applied.
    pub applied_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::note::Entity",
        from = "Column::NoteId",
        to = "super::note::Column::Id",
        on_delete = "Cascade"
    )]
    Note,
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Note.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::soft_deletable!(Entity);
