// ABOUTME: Tag entity shared across workspaces, keyed by a unique machine name
// ABOUTME: Made available to workspaces and applied to notes through join rows

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub display_name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workspace_tag::Entity")]
    WorkspaceTags,
    #[sea_orm(has_many = "super::note_tag::Entity")]
    NoteTags,
}

impl Related<super::workspace_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkspaceTags.def()
    }
}

impl Related<super::note_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoteTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::soft_deletable!(Entity);
