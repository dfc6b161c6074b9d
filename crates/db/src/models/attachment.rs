use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::attachment, models::ids};

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Uploader not found")]
    UploaderNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Metadata record for an uploaded binary. The binary itself lives in the
/// object store under `storage_key`; the registry service keeps the pair in
/// sync.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_name: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub storage_key: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub file_name: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub storage_key: String,
}

impl Attachment {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: attachment::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let uploaded_by = ids::person_uuid_by_id(db, model.uploaded_by)
            .await?
            .ok_or(DbErr::RecordNotFound("Person not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id,
            file_name: model.file_name,
            size_bytes: model.size_bytes,
            mime_type: model.mime_type,
            storage_key: model.storage_key,
            uploaded_by,
            created_at: model.created_at.into(),
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        uploaded_by: Uuid,
        data: &CreateAttachment,
    ) -> Result<Self, AttachmentError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(AttachmentError::TaskNotFound)?;
        let uploader_row_id = ids::person_id_by_uuid(db, uploaded_by)
            .await?
            .ok_or(AttachmentError::UploaderNotFound)?;

        let active = attachment::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            file_name: Set(data.file_name.clone()),
            size_bytes: Set(data.size_bytes),
            mime_type: Set(data.mime_type.clone()),
            storage_key: Set(data.storage_key.clone()),
            uploaded_by: Set(uploader_row_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = attachment::Entity::find()
            .filter(attachment::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, AttachmentError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(AttachmentError::TaskNotFound)?;

        let models = attachment::Entity::find()
            .filter(attachment::Column::TaskId.eq(task_row_id))
            .order_by_asc(attachment::Column::Id)
            .all(db)
            .await?;

        let mut attachments = Vec::with_capacity(models.len());
        for model in models {
            attachments.push(Self::from_model(db, model).await?);
        }
        Ok(attachments)
    }

    /// Removes the metadata record only; the caller is responsible for the
    /// paired binary (see the attachment service for the ordering).
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = attachment::Entity::delete_many()
            .filter(attachment::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
