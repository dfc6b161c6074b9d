use sea_orm::entity::prelude::*;

use crate::types::{TaskCategory, TaskPriority, TaskStage};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub organisation_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub stage: TaskStage,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub due_date: Option<Date>,
    pub requires_approval: bool,
    pub version: i64,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub client_id: Option<i64>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
