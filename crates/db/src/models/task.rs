use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::{TaskCategory, TaskPriority, TaskStage};

use crate::{
    entities::{person, task},
    models::{
        ids,
        task_transition::{NewTransition, TaskTransition},
    },
    types::TransitionKind,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    #[error("Organisation not found")]
    OrganisationNotFound,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Task was modified concurrently (expected version {expected}, found {found})")]
    Conflict { expected: i64, found: i64 },
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub stage: TaskStage,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub due_date: Option<NaiveDate>,
    pub requires_approval: bool,
    pub version: i64,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task plus the display names the board needs for rendering and text
/// filtering.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithPeople {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub creator_name: String,
    pub assignee_name: Option<String>,
    pub client_name: Option<String>,
}

impl std::ops::Deref for TaskWithPeople {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

impl std::ops::DerefMut for TaskWithPeople {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.task
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    /// Restricted to backlog/todo; a task cannot be created already done.
    pub initial_stage: Option<TaskStage>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub requires_approval: bool,
    pub assignee_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

/// Full-record replace of the editable fields. This path writes fields
/// directly: it performs no completion bookkeeping and leaves no audit
/// entry, even when `stage` changes. Stage changes that need those belong
/// on [`Task::transition_stage`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateTaskFields {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub stage: TaskStage,
    pub due_date: Option<NaiveDate>,
    pub requires_approval: bool,
    pub assignee_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

/// Filter selection for an organisation's task list. Matching happens over
/// the already-fetched list, not in the store.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub search: Option<String>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub assignee: Option<AssigneeFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    Unassigned,
    Person(Uuid),
}

impl std::str::FromStr for AssigneeFilter {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("unassigned") {
            return Ok(Self::Unassigned);
        }
        Uuid::parse_str(value).map(Self::Person)
    }
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.assignee.is_none()
    }

    pub fn matches(&self, task: &TaskWithPeople) -> bool {
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(category) = self.category
            && task.category != category
        {
            return false;
        }
        match self.assignee {
            Some(AssigneeFilter::Unassigned) if task.assignee_id.is_some() => return false,
            Some(AssigneeFilter::Person(person_id)) if task.assignee_id != Some(person_id) => {
                return false;
            }
            _ => {}
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let mut haystacks = vec![task.title.to_lowercase()];
            if let Some(description) = &task.description {
                haystacks.push(description.to_lowercase());
            }
            if let Some(assignee_name) = &task.assignee_name {
                haystacks.push(assignee_name.to_lowercase());
            }
            if let Some(client_name) = &task.client_name {
                haystacks.push(client_name.to_lowercase());
            }
            if !haystacks.iter().any(|hay| hay.contains(&needle)) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, tasks: Vec<TaskWithPeople>) -> Vec<TaskWithPeople> {
        if self.is_empty() {
            return tasks;
        }
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let organisation_id = ids::organisation_uuid_by_id(db, model.organisation_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Organisation not found".to_string()))?;
        let creator_id = ids::person_uuid_by_id(db, model.creator_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Person not found".to_string()))?;
        let assignee_id = match model.assignee_id {
            Some(id) => ids::person_uuid_by_id(db, id).await?,
            None => None,
        };
        let client_id = match model.client_id {
            Some(id) => ids::person_uuid_by_id(db, id).await?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            organisation_id,
            title: model.title,
            description: model.description,
            stage: model.stage,
            priority: model.priority,
            category: model.category,
            due_date: model.due_date,
            requires_approval: model.requires_approval,
            version: model.version,
            creator_id,
            assignee_id,
            client_id,
            completed_at: model.completed_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        organisation_id: Uuid,
        data: &CreateTask,
        created_by: Uuid,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        if data.title.trim().is_empty() {
            return Err(TaskError::ValidationError(
                "Task title must not be empty".to_string(),
            ));
        }
        let initial_stage = data.initial_stage.unwrap_or(TaskStage::Backlog);
        if !matches!(initial_stage, TaskStage::Backlog | TaskStage::Todo) {
            return Err(TaskError::ValidationError(format!(
                "Tasks cannot be created in stage '{initial_stage}'"
            )));
        }

        let organisation_row_id = ids::organisation_id_by_uuid(db, organisation_id)
            .await?
            .ok_or(TaskError::OrganisationNotFound)?;
        let creator_row_id = ids::person_id_by_uuid(db, created_by)
            .await?
            .ok_or_else(|| TaskError::PermissionDenied("Unknown creator".to_string()))?;
        let assignee_row_id = match data.assignee_id {
            Some(id) => Some(ids::person_id_by_uuid(db, id).await?.ok_or_else(|| {
                TaskError::ValidationError("Assignee is not a known person".to_string())
            })?),
            None => None,
        };
        let client_row_id = match data.client_id {
            Some(id) => Some(ids::person_id_by_uuid(db, id).await?.ok_or_else(|| {
                TaskError::ValidationError("Client is not a known person".to_string())
            })?),
            None => None,
        };

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            organisation_id: Set(organisation_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            stage: Set(initial_stage),
            priority: Set(data.priority.unwrap_or_default()),
            category: Set(data.category.unwrap_or_default()),
            due_date: Set(data.due_date),
            requires_approval: Set(data.requires_approval),
            version: Set(1),
            creator_id: Set(creator_row_id),
            assignee_id: Set(assignee_row_id),
            client_id: Set(client_row_id),
            completed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// All tasks of the organisation, newest first, with referenced people
    /// resolved to display names. Filtering is the caller's concern via
    /// [`TaskFilters::apply`].
    pub async fn find_by_organisation_with_people<C: ConnectionTrait>(
        db: &C,
        organisation_id: Uuid,
    ) -> Result<Vec<TaskWithPeople>, TaskError> {
        let organisation_row_id = ids::organisation_id_by_uuid(db, organisation_id)
            .await?
            .ok_or(TaskError::OrganisationNotFound)?;

        let models = task::Entity::find()
            .filter(task::Column::OrganisationId.eq(organisation_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            let creator_row_id = model.creator_id;
            let assignee_row_id = model.assignee_id;
            let client_row_id = model.client_id;
            let task = Self::from_model(db, model).await?;
            let creator_name = display_name_by_row_id(db, creator_row_id)
                .await?
                .unwrap_or_default();
            let assignee_name = match assignee_row_id {
                Some(id) => display_name_by_row_id(db, id).await?,
                None => None,
            };
            let client_name = match client_row_id {
                Some(id) => display_name_by_row_id(db, id).await?,
                None => None,
            };
            tasks.push(TaskWithPeople {
                task,
                creator_name,
                assignee_name,
                client_name,
            });
        }
        Ok(tasks)
    }

    /// Direct field write. Bumps the version and `updated_at` but performs
    /// no completion bookkeeping and records no audit entry; see
    /// [`UpdateTaskFields`].
    pub async fn update_fields<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTaskFields,
        expected_version: Option<i64>,
    ) -> Result<Self, TaskError> {
        if data.title.trim().is_empty() {
            return Err(TaskError::ValidationError(
                "Task title must not be empty".to_string(),
            ));
        }

        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        check_version(&record, expected_version)?;

        let assignee_row_id = match data.assignee_id {
            Some(id) => Some(ids::person_id_by_uuid(db, id).await?.ok_or_else(|| {
                TaskError::ValidationError("Assignee is not a known person".to_string())
            })?),
            None => None,
        };
        let client_row_id = match data.client_id {
            Some(id) => Some(ids::person_id_by_uuid(db, id).await?.ok_or_else(|| {
                TaskError::ValidationError("Client is not a known person".to_string())
            })?),
            None => None,
        };

        let version = record.version;
        let mut active: task::ActiveModel = record.into();
        active.title = Set(data.title.clone());
        active.description = Set(data.description.clone());
        active.priority = Set(data.priority);
        active.category = Set(data.category);
        active.stage = Set(data.stage);
        active.due_date = Set(data.due_date);
        active.requires_approval = Set(data.requires_approval);
        active.assignee_id = Set(assignee_row_id);
        active.client_id = Set(client_row_id);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// The canonical stage-change procedure: stage write, completion
    /// bookkeeping, and audit entry commit together. A transition to the
    /// current stage returns the task untouched.
    pub async fn transition_stage<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
        new_stage: TaskStage,
        performed_by: Uuid,
        notes: Option<String>,
        metadata: Option<serde_json::Value>,
        expected_version: Option<i64>,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        check_version(&record, expected_version)?;

        let performer_row_id = ids::person_id_by_uuid(db, performed_by)
            .await?
            .ok_or_else(|| TaskError::PermissionDenied("Unknown performer".to_string()))?;

        if record.stage == new_stage {
            return Ok(Self::from_model(db, record).await?);
        }

        let task_row_id = record.id;
        let from_stage = record.stage;
        let version = record.version;
        let now = Utc::now();

        let tx = db.begin().await?;
        let mut active: task::ActiveModel = record.into();
        active.stage = Set(new_stage);
        active.completed_at = Set(if new_stage == TaskStage::Done {
            Some(now.into())
        } else {
            None
        });
        active.version = Set(version + 1);
        active.updated_at = Set(now.into());
        let updated = active.update(&tx).await?;

        TaskTransition::record(
            &tx,
            NewTransition {
                task_row_id,
                kind: TransitionKind::StageChange,
                from_stage: Some(from_stage),
                to_stage: Some(new_stage),
                from_assignee_row_id: None,
                to_assignee_row_id: None,
                performer_row_id,
                notes,
                metadata,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(Self::from_model(db, updated).await?)
    }

    /// Reassignment runs through its own audited procedure so that handing
    /// a task over never hides inside a general field edit. The assignee is
    /// deliberately not checked against the resolved member set.
    pub async fn assign<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
        assignee_id: Option<Uuid>,
        performed_by: Uuid,
        notes: Option<String>,
        metadata: Option<serde_json::Value>,
        expected_version: Option<i64>,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        check_version(&record, expected_version)?;

        let performer_row_id = ids::person_id_by_uuid(db, performed_by)
            .await?
            .ok_or_else(|| TaskError::PermissionDenied("Unknown performer".to_string()))?;
        let new_assignee_row_id = match assignee_id {
            Some(id) => Some(ids::person_id_by_uuid(db, id).await?.ok_or_else(|| {
                TaskError::ValidationError("Assignee is not a known person".to_string())
            })?),
            None => None,
        };

        if record.assignee_id == new_assignee_row_id {
            return Ok(Self::from_model(db, record).await?);
        }

        let task_row_id = record.id;
        let from_assignee_row_id = record.assignee_id;
        let version = record.version;
        let now = Utc::now();

        let tx = db.begin().await?;
        let mut active: task::ActiveModel = record.into();
        active.assignee_id = Set(new_assignee_row_id);
        active.version = Set(version + 1);
        active.updated_at = Set(now.into());
        let updated = active.update(&tx).await?;

        TaskTransition::record(
            &tx,
            NewTransition {
                task_row_id,
                kind: TransitionKind::Assignment,
                from_stage: None,
                to_stage: None,
                from_assignee_row_id,
                to_assignee_row_id: new_assignee_row_id,
                performer_row_id,
                notes,
                metadata,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(Self::from_model(db, updated).await?)
    }
}

fn check_version(record: &task::Model, expected_version: Option<i64>) -> Result<(), TaskError> {
    if let Some(expected) = expected_version
        && expected != record.version
    {
        return Err(TaskError::Conflict {
            expected,
            found: record.version,
        });
    }
    Ok(())
}

async fn display_name_by_row_id<C: ConnectionTrait>(
    db: &C,
    row_id: i64,
) -> Result<Option<String>, DbErr> {
    use sea_orm::QuerySelect;

    person::Entity::find()
        .select_only()
        .column(person::Column::DisplayName)
        .filter(person::Column::Id.eq(row_id))
        .into_tuple()
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        organisation::{CreateOrganisation, Organisation},
        person::{CreatePerson, Person},
        task_transition::TaskTransition,
    };
    use crate::types::TransitionKind;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_person(db: &sea_orm::DatabaseConnection, name: &str) -> Person {
        Person::create(
            db,
            &CreatePerson {
                display_name: name.to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn seed_organisation(
        db: &sea_orm::DatabaseConnection,
        owner: Option<Uuid>,
    ) -> Organisation {
        Organisation::create(
            db,
            &CreateOrganisation {
                name: "Bright Tutors".to_string(),
                owner_id: owner,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    fn new_task(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            priority: None,
            category: None,
            initial_stage: None,
            due_date: None,
            requires_approval: false,
            assignee_id: None,
            client_id: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;

        let result = Task::create(&db, org.id, &new_task("   "), admin.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(TaskError::ValidationError(_))));
    }

    #[tokio::test]
    async fn create_restricts_initial_stage() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;

        let mut data = new_task("Chase invoice");
        data.initial_stage = Some(TaskStage::Done);
        let result = Task::create(&db, org.id, &data, admin.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(TaskError::ValidationError(_))));

        data.initial_stage = Some(TaskStage::Todo);
        let task = Task::create(&db, org.id, &data, admin.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(task.stage, TaskStage::Todo);
        assert_eq!(task.version, 1);
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn transition_sets_and_clears_completed_at() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;
        let task = Task::create(&db, org.id, &new_task("Review tutor"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        let done = Task::transition_stage(
            &db,
            task.id,
            TaskStage::Done,
            admin.id,
            None,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(done.stage, TaskStage::Done);
        assert!(done.completed_at.is_some());

        let reopened = Task::transition_stage(
            &db,
            task.id,
            TaskStage::Todo,
            admin.id,
            None,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(reopened.stage, TaskStage::Todo);
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn same_stage_transition_is_a_noop() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;
        let task = Task::create(&db, org.id, &new_task("Call parent"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        let unchanged = Task::transition_stage(
            &db,
            task.id,
            TaskStage::Backlog,
            admin.id,
            None,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(unchanged.version, task.version);
        assert_eq!(unchanged.updated_at, task.updated_at);
        assert!(unchanged.completed_at.is_none());

        let trail = TaskTransition::find_by_task_id(&db, task.id).await.unwrap();
        assert!(trail.is_empty());
    }

    #[tokio::test]
    async fn update_fields_skips_completion_bookkeeping() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;
        let task = Task::create(&db, org.id, &new_task("Upload DBS"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        // Editing the stage through the field path leaves completed_at and
        // the audit trail untouched. Callers that want bookkeeping must use
        // transition_stage.
        let edited = Task::update_fields(
            &db,
            task.id,
            &UpdateTaskFields {
                title: task.title.clone(),
                description: task.description.clone(),
                priority: task.priority,
                category: task.category,
                stage: TaskStage::Done,
                due_date: None,
                requires_approval: false,
                assignee_id: None,
                client_id: None,
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(edited.stage, TaskStage::Done);
        assert!(edited.completed_at.is_none());
        let trail = TaskTransition::find_by_task_id(&db, task.id).await.unwrap();
        assert!(trail.is_empty());
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;
        let task = Task::create(&db, org.id, &new_task("Refund client"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        Task::transition_stage(&db, task.id, TaskStage::Todo, admin.id, None, None, Some(1))
            .await
            .unwrap();

        let stale = Task::transition_stage(
            &db,
            task.id,
            TaskStage::InProgress,
            admin.id,
            None,
            None,
            Some(1),
        )
        .await;
        assert!(matches!(
            stale,
            Err(TaskError::Conflict {
                expected: 1,
                found: 2
            })
        ));

        let current = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(current.stage, TaskStage::Todo);
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn assignment_is_audited_and_not_membership_checked() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        // An outsider: a known person with no connection edge into the
        // organisation's member group. Assignment still goes through; the
        // member set only feeds the picker.
        let outsider = seed_person(&db, "Outsider").await;
        let org = seed_organisation(&db, Some(admin.id)).await;
        let task = Task::create(&db, org.id, &new_task("Match tutor"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        let assigned = Task::assign(&db, task.id, Some(outsider.id), admin.id, None, None, None)
            .await
            .unwrap();
        assert_eq!(assigned.assignee_id, Some(outsider.id));

        let trail = TaskTransition::find_by_task_id(&db, task.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].kind, TransitionKind::Assignment);
        assert_eq!(trail[0].from_assignee_id, None);
        assert_eq!(trail[0].to_assignee_id, Some(outsider.id));
        assert_eq!(trail[0].performed_by, admin.id);

        // Re-assigning the same person is a no-op.
        let unchanged = Task::assign(&db, task.id, Some(outsider.id), admin.id, None, None, None)
            .await
            .unwrap();
        assert_eq!(unchanged.version, assigned.version);
        let trail = TaskTransition::find_by_task_id(&db, task.id).await.unwrap();
        assert_eq!(trail.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_records_audit_trail() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let org = seed_organisation(&db, Some(admin.id)).await;

        let mut data = new_task("Fix invoice");
        data.priority = Some(TaskPriority::High);
        data.category = Some(TaskCategory::PaymentIssue);
        let task = Task::create(&db, org.id, &data, admin.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(task.stage, TaskStage::Backlog);

        Task::transition_stage(&db, task.id, TaskStage::Todo, admin.id, None, None, None)
            .await
            .unwrap();
        let done = Task::transition_stage(&db, task.id, TaskStage::Done, admin.id, None, None, None)
            .await
            .unwrap();

        assert_eq!(done.stage, TaskStage::Done);
        assert!(done.completed_at.is_some());

        let trail = TaskTransition::find_by_task_id(&db, task.id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].from_stage, Some(TaskStage::Backlog));
        assert_eq!(trail[0].to_stage, Some(TaskStage::Todo));
        assert_eq!(trail[1].from_stage, Some(TaskStage::Todo));
        assert_eq!(trail[1].to_stage, Some(TaskStage::Done));
    }

    #[tokio::test]
    async fn filters_match_text_priority_and_assignee() {
        let db = setup_db().await;
        let admin = seed_person(&db, "Admin").await;
        let tutor = seed_person(&db, "Priya Nair").await;
        let org = seed_organisation(&db, Some(admin.id)).await;

        let mut assigned = new_task("Chase invoice");
        assigned.priority = Some(TaskPriority::High);
        assigned.assignee_id = Some(tutor.id);
        Task::create(&db, org.id, &assigned, admin.id, Uuid::new_v4())
            .await
            .unwrap();
        Task::create(&db, org.id, &new_task("Print flyers"), admin.id, Uuid::new_v4())
            .await
            .unwrap();

        let tasks = Task::find_by_organisation_with_people(&db, org.id)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);

        let by_name = TaskFilters {
            search: Some("priya".to_string()),
            ..Default::default()
        }
        .apply(tasks.clone());
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].title, "Chase invoice");

        let by_priority = TaskFilters {
            priority: Some(TaskPriority::High),
            ..Default::default()
        }
        .apply(tasks.clone());
        assert_eq!(by_priority.len(), 1);

        let unassigned = TaskFilters {
            assignee: Some(AssigneeFilter::Unassigned),
            ..Default::default()
        }
        .apply(tasks);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].title, "Print flyers");
    }
}
