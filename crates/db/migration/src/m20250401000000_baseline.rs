use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(People::Table)
                    .col(pk_id_col(manager, People::Id))
                    .col(uuid_col(People::Uuid))
                    .col(ColumnDef::new(People::DisplayName).string().not_null())
                    .col(timestamp_col(People::CreatedAt))
                    .col(timestamp_col(People::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_people_uuid")
                    .table(People::Table)
                    .col(People::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Organisations::Table)
                    .col(pk_id_col(manager, Organisations::Id))
                    .col(uuid_col(Organisations::Uuid))
                    .col(ColumnDef::new(Organisations::Name).string().not_null())
                    .col(fk_id_nullable_col(manager, Organisations::OwnerId))
                    .col(timestamp_col(Organisations::CreatedAt))
                    .col(timestamp_col(Organisations::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organisations_owner_id")
                            .from(Organisations::Table, Organisations::OwnerId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_organisations_uuid")
                    .table(Organisations::Table)
                    .col(Organisations::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(MemberGroups::Table)
                    .col(pk_id_col(manager, MemberGroups::Id))
                    .col(uuid_col(MemberGroups::Uuid))
                    .col(fk_id_col(manager, MemberGroups::OrganisationId))
                    .col(timestamp_col(MemberGroups::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_member_groups_organisation_id")
                            .from(MemberGroups::Table, MemberGroups::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_member_groups_uuid")
                    .table(MemberGroups::Table)
                    .col(MemberGroups::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_member_groups_organisation_id")
                    .table(MemberGroups::Table)
                    .col(MemberGroups::OrganisationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Connections::Table)
                    .col(pk_id_col(manager, Connections::Id))
                    .col(uuid_col(Connections::Uuid))
                    .col(fk_id_col(manager, Connections::GroupId))
                    .col(fk_id_col(manager, Connections::SourcePersonId))
                    .col(fk_id_col(manager, Connections::TargetPersonId))
                    .col(timestamp_col(Connections::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_group_id")
                            .from(Connections::Table, Connections::GroupId)
                            .to(MemberGroups::Table, MemberGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_source_person_id")
                            .from(Connections::Table, Connections::SourcePersonId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_target_person_id")
                            .from(Connections::Table, Connections::TargetPersonId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_connections_uuid")
                    .table(Connections::Table)
                    .col(Connections::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_connections_group_id")
                    .table(Connections::Table)
                    .col(Connections::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::OrganisationId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Stage)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("backlog")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Category)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("general")),
                    )
                    .col(ColumnDef::new(Tasks::DueDate).date())
                    .col(
                        ColumnDef::new(Tasks::RequiresApproval)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(Tasks::Version)
                            .integer()
                            .not_null()
                            .default(Expr::val(1)),
                    )
                    .col(fk_id_col(manager, Tasks::CreatorId))
                    .col(fk_id_nullable_col(manager, Tasks::AssigneeId))
                    .col(fk_id_nullable_col(manager, Tasks::ClientId))
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_organisation_id")
                            .from(Tasks::Table, Tasks::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_creator_id")
                            .from(Tasks::Table, Tasks::CreatorId)
                            .to(People::Table, People::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_assignee_id")
                            .from(Tasks::Table, Tasks::AssigneeId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_client_id")
                            .from(Tasks::Table, Tasks::ClientId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_organisation_id")
                    .table(Tasks::Table)
                    .col(Tasks::OrganisationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_stage")
                    .table(Tasks::Table)
                    .col(Tasks::Stage)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskTransitions::Table)
                    .col(pk_id_col(manager, TaskTransitions::Id))
                    .col(uuid_col(TaskTransitions::Uuid))
                    .col(fk_id_col(manager, TaskTransitions::TaskId))
                    .col(
                        ColumnDef::new(TaskTransitions::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaskTransitions::FromStage).string_len(32))
                    .col(ColumnDef::new(TaskTransitions::ToStage).string_len(32))
                    .col(fk_id_nullable_col(manager, TaskTransitions::FromAssigneeId))
                    .col(fk_id_nullable_col(manager, TaskTransitions::ToAssigneeId))
                    .col(fk_id_col(manager, TaskTransitions::PerformedBy))
                    .col(ColumnDef::new(TaskTransitions::Notes).text())
                    .col(ColumnDef::new(TaskTransitions::Metadata).json())
                    .col(timestamp_col(TaskTransitions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_transitions_task_id")
                            .from(TaskTransitions::Table, TaskTransitions::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_transitions_performed_by")
                            .from(TaskTransitions::Table, TaskTransitions::PerformedBy)
                            .to(People::Table, People::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_transitions_uuid")
                    .table(TaskTransitions::Table)
                    .col(TaskTransitions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_transitions_task_id")
                    .table(TaskTransitions::Table)
                    .col(TaskTransitions::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Comments::Table)
                    .col(pk_id_col(manager, Comments::Id))
                    .col(uuid_col(Comments::Uuid))
                    .col(fk_id_col(manager, Comments::TaskId))
                    .col(fk_id_col(manager, Comments::AuthorId))
                    .col(ColumnDef::new(Comments::Body).text().not_null())
                    .col(timestamp_col(Comments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_task_id")
                            .from(Comments::Table, Comments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_author_id")
                            .from(Comments::Table, Comments::AuthorId)
                            .to(People::Table, People::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_comments_uuid")
                    .table(Comments::Table)
                    .col(Comments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_comments_task_id")
                    .table(Comments::Table)
                    .col(Comments::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Attachments::Table)
                    .col(pk_id_col(manager, Attachments::Id))
                    .col(uuid_col(Attachments::Uuid))
                    .col(fk_id_col(manager, Attachments::TaskId))
                    .col(ColumnDef::new(Attachments::FileName).string().not_null())
                    .col(
                        ColumnDef::new(Attachments::SizeBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Attachments::MimeType).string())
                    .col(ColumnDef::new(Attachments::StorageKey).string().not_null())
                    .col(fk_id_col(manager, Attachments::UploadedBy))
                    .col(timestamp_col(Attachments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_task_id")
                            .from(Attachments::Table, Attachments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_uploaded_by")
                            .from(Attachments::Table, Attachments::UploadedBy)
                            .to(People::Table, People::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attachments_uuid")
                    .table(Attachments::Table)
                    .col(Attachments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attachments_task_id")
                    .table(Attachments::Table)
                    .col(Attachments::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attachments_storage_key")
                    .table(Attachments::Table)
                    .col(Attachments::StorageKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskTransitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MemberGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organisations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(People::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum People {
    Table,
    Id,
    Uuid,
    DisplayName,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Organisations {
    Table,
    Id,
    Uuid,
    Name,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum MemberGroups {
    Table,
    Id,
    Uuid,
    OrganisationId,
    CreatedAt,
}

#[derive(Iden)]
enum Connections {
    Table,
    Id,
    Uuid,
    GroupId,
    SourcePersonId,
    TargetPersonId,
    CreatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    OrganisationId,
    Title,
    Description,
    Stage,
    Priority,
    Category,
    DueDate,
    RequiresApproval,
    Version,
    CreatorId,
    AssigneeId,
    ClientId,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskTransitions {
    Table,
    Id,
    Uuid,
    TaskId,
    Kind,
    FromStage,
    ToStage,
    FromAssigneeId,
    ToAssigneeId,
    PerformedBy,
    Notes,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum Comments {
    Table,
    Id,
    Uuid,
    TaskId,
    AuthorId,
    Body,
    CreatedAt,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    Uuid,
    TaskId,
    FileName,
    SizeBytes,
    MimeType,
    StorageKey,
    UploadedBy,
    CreatedAt,
}
