use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{member_group, organisation},
    models::{ids, person::Person},
};

#[derive(Debug, Error)]
pub enum OrganisationError {
    #[error("Organisation not found")]
    NotFound,
    #[error("Organisation owner not found")]
    OwnerNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Organisation {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub member_group_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateOrganisation {
    pub name: String,
    pub owner_id: Option<Uuid>,
}

impl Organisation {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: organisation::Model,
    ) -> Result<Self, DbErr> {
        let owner_id = match model.owner_id {
            Some(id) => ids::person_uuid_by_id(db, id).await?,
            None => None,
        };
        let member_group_id = member_group_uuid_by_organisation_row(db, model.id)
            .await?
            .ok_or(DbErr::RecordNotFound("Member group not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            name: model.name,
            owner_id,
            member_group_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    /// Inserts the organisation together with its member group. Callers that
    /// need atomicity wrap this in a transaction.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateOrganisation,
        organisation_id: Uuid,
    ) -> Result<Self, OrganisationError> {
        let owner_row_id = match data.owner_id {
            Some(id) => Some(
                ids::person_id_by_uuid(db, id)
                    .await?
                    .ok_or(OrganisationError::OwnerNotFound)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let active = organisation::ActiveModel {
            uuid: Set(organisation_id),
            name: Set(data.name.clone()),
            owner_id: Set(owner_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let group = member_group::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            organisation_id: Set(model.id),
            created_at: Set(now.into()),
            ..Default::default()
        };
        group.insert(db).await?;

        Ok(Self::from_model(db, model).await?)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = organisation::Entity::find()
            .filter(organisation::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Owner lookup for member resolution. `Ok(None)` covers both an
    /// ownerless organisation and an owner row that no longer resolves.
    pub async fn find_owner<C: ConnectionTrait>(&self, db: &C) -> Result<Option<Person>, DbErr> {
        match self.owner_id {
            Some(owner_id) => Person::find_by_id(db, owner_id).await,
            None => Ok(None),
        }
    }
}

async fn member_group_uuid_by_organisation_row<C: ConnectionTrait>(
    db: &C,
    organisation_row_id: i64,
) -> Result<Option<Uuid>, DbErr> {
    use sea_orm::QuerySelect;

    member_group::Entity::find()
        .select_only()
        .column(member_group::Column::Uuid)
        .filter(member_group::Column::OrganisationId.eq(organisation_row_id))
        .into_tuple()
        .one(db)
        .await
}
