use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{connection, person},
    models::{ids, person::PersonSummary},
};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Member group not found")]
    GroupNotFound,
    #[error("Person not found")]
    PersonNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// A bidirectional edge recorded against an organisation's member group.
/// Which side initiated the connection carries no meaning for membership.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Connection {
    pub id: Uuid,
    pub group_id: Uuid,
    pub source: PersonSummary,
    pub target: PersonSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateConnection {
    pub source_person_id: Uuid,
    pub target_person_id: Uuid,
}

impl Connection {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        data: &CreateConnection,
    ) -> Result<Self, ConnectionError> {
        let group_row_id = ids::member_group_id_by_uuid(db, group_id)
            .await?
            .ok_or(ConnectionError::GroupNotFound)?;
        let source_row_id = ids::person_id_by_uuid(db, data.source_person_id)
            .await?
            .ok_or(ConnectionError::PersonNotFound)?;
        let target_row_id = ids::person_id_by_uuid(db, data.target_person_id)
            .await?
            .ok_or(ConnectionError::PersonNotFound)?;

        let active = connection::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            group_id: Set(group_row_id),
            source_person_id: Set(source_row_id),
            target_person_id: Set(target_row_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Self::from_model(db, group_id, model).await
    }

    async fn from_model<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        model: connection::Model,
    ) -> Result<Self, ConnectionError> {
        let source = person_summary_by_row_id(db, model.source_person_id)
            .await?
            .ok_or(ConnectionError::PersonNotFound)?;
        let target = person_summary_by_row_id(db, model.target_person_id)
            .await?
            .ok_or(ConnectionError::PersonNotFound)?;

        Ok(Self {
            id: model.uuid,
            group_id,
            source,
            target,
            created_at: model.created_at.into(),
        })
    }

    /// All edges recorded against the group, oldest first. Edges whose
    /// endpoints no longer resolve are skipped rather than failing the
    /// enumeration.
    pub async fn find_by_group_id<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
    ) -> Result<Vec<Self>, ConnectionError> {
        let group_row_id = ids::member_group_id_by_uuid(db, group_id)
            .await?
            .ok_or(ConnectionError::GroupNotFound)?;

        let models = connection::Entity::find()
            .filter(connection::Column::GroupId.eq(group_row_id))
            .order_by_asc(connection::Column::Id)
            .all(db)
            .await?;

        let mut edges = Vec::with_capacity(models.len());
        for model in models {
            let source = person_summary_by_row_id(db, model.source_person_id).await?;
            let target = person_summary_by_row_id(db, model.target_person_id).await?;
            match (source, target) {
                (Some(source), Some(target)) => edges.push(Self {
                    id: model.uuid,
                    group_id,
                    source,
                    target,
                    created_at: model.created_at.into(),
                }),
                _ => {
                    tracing::warn!(connection = %model.uuid, "Skipping edge with unresolvable endpoint");
                }
            }
        }
        Ok(edges)
    }
}

async fn person_summary_by_row_id<C: ConnectionTrait>(
    db: &C,
    row_id: i64,
) -> Result<Option<PersonSummary>, DbErr> {
    let record = person::Entity::find_by_id(row_id).one(db).await?;
    Ok(record.map(|model| PersonSummary {
        id: model.uuid,
        display_name: model.display_name,
    }))
}
