// ABOUTME: Workspace entity: a uniquely named container scoping notes, tags and access
// ABOUTME: Access is never implicit; it is granted through permission rows only

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workspaces")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::permission::Entity")]
    Permissions,
    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
    #[sea_orm(has_many = "super::workspace_tag::Entity")]
    WorkspaceTags,
}

impl Related<super::permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permissions.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::workspace_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkspaceTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::workspace_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::workspace_tag::Relation::Workspace.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::soft_deletable!(Entity);
