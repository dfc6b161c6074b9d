use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::task_transition,
    models::ids,
    types::{TaskStage, TransitionKind},
};

/// One audit entry, written in the same transaction as the stage or
/// assignee change it describes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskTransition {
    pub id: Uuid,
    pub task_id: Uuid,
    pub kind: TransitionKind,
    pub from_stage: Option<TaskStage>,
    pub to_stage: Option<TaskStage>,
    pub from_assignee_id: Option<Uuid>,
    pub to_assignee_id: Option<Uuid>,
    pub performed_by: Uuid,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub(crate) struct NewTransition {
    pub task_row_id: i64,
    pub kind: TransitionKind,
    pub from_stage: Option<TaskStage>,
    pub to_stage: Option<TaskStage>,
    pub from_assignee_row_id: Option<i64>,
    pub to_assignee_row_id: Option<i64>,
    pub performer_row_id: i64,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TaskTransition {
    pub(crate) async fn record<C: ConnectionTrait>(
        db: &C,
        data: NewTransition,
    ) -> Result<(), DbErr> {
        let active = task_transition::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(data.task_row_id),
            kind: Set(data.kind),
            from_stage: Set(data.from_stage),
            to_stage: Set(data.to_stage),
            from_assignee_id: Set(data.from_assignee_row_id),
            to_assignee_id: Set(data.to_assignee_row_id),
            performed_by: Set(data.performer_row_id),
            notes: Set(data.notes),
            metadata: Set(data.metadata),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    async fn from_model<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        model: task_transition::Model,
    ) -> Result<Self, DbErr> {
        let from_assignee_id = match model.from_assignee_id {
            Some(id) => ids::person_uuid_by_id(db, id).await?,
            None => None,
        };
        let to_assignee_id = match model.to_assignee_id {
            Some(id) => ids::person_uuid_by_id(db, id).await?,
            None => None,
        };
        let performed_by = ids::person_uuid_by_id(db, model.performed_by)
            .await?
            .ok_or(DbErr::RecordNotFound("Person not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id,
            kind: model.kind,
            from_stage: model.from_stage,
            to_stage: model.to_stage,
            from_assignee_id,
            to_assignee_id,
            performed_by,
            notes: model.notes,
            metadata: model.metadata,
            created_at: model.created_at.into(),
        })
    }

    /// The task's audit trail, oldest first. An unknown task id yields an
    /// empty trail.
    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = task_transition::Entity::find()
            .filter(task_transition::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_transition::Column::Id)
            .all(db)
            .await?;

        let mut transitions = Vec::with_capacity(models.len());
        for model in models {
            transitions.push(Self::from_model(db, task_id, model).await?);
        }
        Ok(transitions)
    }
}
