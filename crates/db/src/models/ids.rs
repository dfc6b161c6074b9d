use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{member_group, organisation, person, task};

pub async fn person_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    person::Entity::find()
        .select_only()
        .column(person::Column::Id)
        .filter(person::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn person_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    person::Entity::find()
        .select_only()
        .column(person::Column::Uuid)
        .filter(person::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn organisation_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    organisation::Entity::find()
        .select_only()
        .column(organisation::Column::Id)
        .filter(organisation::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn organisation_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    organisation::Entity::find()
        .select_only()
        .column(organisation::Column::Uuid)
        .filter(organisation::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn member_group_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    member_group::Entity::find()
        .select_only()
        .column(member_group::Column::Id)
        .filter(member_group::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn member_group_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    member_group::Entity::find()
        .select_only()
        .column(member_group::Column::Uuid)
        .filter(member_group::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Uuid)
        .filter(task::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}
