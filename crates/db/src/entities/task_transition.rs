use sea_orm::entity::prelude::*;

use crate::types::{TaskStage, TransitionKind};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "task_transitions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub task_id: i64,
    pub kind: TransitionKind,
    pub from_stage: Option<TaskStage>,
    pub to_stage: Option<TaskStage>,
    pub from_assignee_id: Option<i64>,
    pub to_assignee_id: Option<i64>,
    pub performed_by: i64,
    pub notes: Option<String>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
