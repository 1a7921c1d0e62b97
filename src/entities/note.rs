// ABOUTME: Note entity with title, free-form content and a monotonic version counter
// ABOUTME: Belongs to one workspace; owns its diff log, tag joins and outgoing links

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub workspace_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub version: i32,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workspace::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspace::Column::Id",
        on_delete = "Cascade"
    )]
    Workspace,
    #[sea_orm(has_many = "super::diff::Entity")]
    Diffs,
    #[sea_orm(has_many = "super::note_tag::Entity")]
    NoteTags,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::diff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Diffs.def()
    }
}

impl Related<super::note_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoteTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::note_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::note_tag::Relation::Note.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::soft_deletable!(Entity);
