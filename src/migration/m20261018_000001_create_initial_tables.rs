// ABOUTME: Initial migration creating users, workspaces, permissions, notes, diffs, tags and links
// ABOUTME: Uniqueness, composite join keys and the no-self-link rule live in the schema itself

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::ApiKey).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::DeletedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Workspaces::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Workspaces::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Workspaces::Description).text())
                    .col(ColumnDef::new(Workspaces::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Workspaces::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Workspaces::DeletedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Permissions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Permissions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Permissions::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(Permissions::CanWrite).boolean().not_null().default(false))
                    .col(ColumnDef::new(Permissions::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Permissions::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Permissions::DeletedAt).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_user_id")
                            .from(Permissions::Table, Permissions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_workspace_id")
                            .from(Permissions::Table, Permissions::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_permissions_user_workspace")
                    .table(Permissions::Table)
                    .col(Permissions::UserId)
                    .col(Permissions::WorkspaceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notes::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(Notes::Title).string().not_null())
                    .col(ColumnDef::new(Notes::Content).text().not_null().default(""))
                    .col(ColumnDef::new(Notes::Version).integer().not_null().default(1))
                    .col(ColumnDef::new(Notes::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Notes::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Notes::DeletedAt).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notes_workspace_id")
                            .from(Notes::Table, Notes::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notes_workspace_id")
                    .table(Notes::Table)
                    .col(Notes::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Diffs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Diffs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Diffs::NoteId).uuid().not_null())
                    .col(ColumnDef::new(Diffs::Position).big_integer().not_null())
                    .col(ColumnDef::new(Diffs::Length).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Diffs::NewText).text().not_null())
                    .col(ColumnDef::new(Diffs::AppliedAt).big_integer())
                    .col(ColumnDef::new(Diffs::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Diffs::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Diffs::DeletedAt).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_diffs_note_id")
                            .from(Diffs::Table, Diffs::NoteId)
                            .to(Notes::Table, Notes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_diffs_note_id")
                    .table(Diffs::Table)
                    .col(Diffs::NoteId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tags::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tags::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Tags::DisplayName).string().not_null())
                    .col(ColumnDef::new(Tags::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Tags::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Tags::DeletedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkspaceTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkspaceTags::WorkspaceId).uuid().not_null())
                    .col(ColumnDef::new(WorkspaceTags::TagId).uuid().not_null())
                    .col(ColumnDef::new(WorkspaceTags::CreatedAt).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(WorkspaceTags::WorkspaceId)
                            .col(WorkspaceTags::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspace_tags_workspace_id")
                            .from(WorkspaceTags::Table, WorkspaceTags::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspace_tags_tag_id")
                            .from(WorkspaceTags::Table, WorkspaceTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NoteTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NoteTags::NoteId).uuid().not_null())
                    .col(ColumnDef::new(NoteTags::TagId).uuid().not_null())
                    .col(ColumnDef::new(NoteTags::CreatedAt).big_integer().not_null())
                    .primary_key(Index::create().col(NoteTags::NoteId).col(NoteTags::TagId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_tags_note_id")
                            .from(NoteTags::Table, NoteTags::NoteId)
                            .to(Notes::Table, Notes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_tags_tag_id")
                            .from(NoteTags::Table, NoteTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Links::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Links::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Links::SourceNoteId).uuid().not_null())
                    .col(ColumnDef::new(Links::TargetNoteId).uuid().not_null())
                    .col(ColumnDef::new(Links::LinkText).string().not_null().default(""))
                    .col(ColumnDef::new(Links::Position).integer().not_null().default(0))
                    .col(ColumnDef::new(Links::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Links::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Links::DeletedAt).big_integer())
                    .check(Expr::col(Links::SourceNoteId).ne(Expr::col(Links::TargetNoteId)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_links_source_note_id")
                            .from(Links::Table, Links::SourceNoteId)
                            .to(Notes::Table, Notes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_links_target_note_id")
                            .from(Links::Table, Links::TargetNoteId)
                            .to(Notes::Table, Notes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_links_source_target_position")
                    .table(Links::Table)
                    .col(Links::SourceNoteId)
                    .col(Links::TargetNoteId)
                    .col(Links::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Links::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(NoteTags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(WorkspaceTags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Diffs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Notes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    ApiKey,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Workspaces {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Permissions {
    Table,
    Id,
    UserId,
    WorkspaceId,
    CanWrite,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Notes {
    Table,
    Id,
    WorkspaceId,
    Title,
    Content,
    Version,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Diffs {
    Table,
    Id,
    NoteId,
    Position,
    Length,
    NewText,
    AppliedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    DisplayName,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum WorkspaceTags {
    Table,
    WorkspaceId,
    TagId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NoteTags {
    Table,
    NoteId,
    TagId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Links {
    Table,
    Id,
    SourceNoteId,
    TargetNoteId,
    LinkText,
    Position,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
