use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::person;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Person {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight `{id, display name}` pair used by member resolution and task
/// listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct PersonSummary {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreatePerson {
    pub display_name: String,
}

impl Person {
    fn from_model(model: person::Model) -> Self {
        Self {
            id: model.uuid,
            display_name: model.display_name,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreatePerson,
        person_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = person::ActiveModel {
            uuid: Set(person_id),
            display_name: Set(data.display_name.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = person::Entity::find()
            .filter(person::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }
}
