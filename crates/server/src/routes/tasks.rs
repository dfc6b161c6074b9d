use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use db::models::{
    organisation::Organisation,
    task::{
        AssigneeFilter, CreateTask, Task, TaskCategory, TaskFilters, TaskPriority, TaskStage,
        TaskWithPeople, UpdateTaskFields,
    },
    task_transition::TaskTransition,
};
use serde::Deserialize;
use ts_rs::TS;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    http::auth::ActingPerson,
    middleware::load_task_middleware,
    routes,
};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub search: Option<String>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    /// A person id, or the literal `unassigned`.
    pub assignee: Option<String>,
}

impl TaskListQuery {
    fn into_filters(self) -> Result<TaskFilters, ApiError> {
        let assignee = match self.assignee.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<AssigneeFilter>().map_err(|_| {
                ApiError::BadRequest(format!("Invalid assignee filter: {raw}"))
            })?),
            None => None,
        };
        Ok(TaskFilters {
            search: self.search,
            priority: self.priority,
            category: self.category,
            assignee,
        })
    }
}

pub async fn get_tasks(
    Extension(organisation): Extension<Organisation>,
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithPeople>>>, ApiError> {
    let filters = query.into_filters()?;
    let tasks = Task::find_by_organisation_with_people(&state.db().conn, organisation.id).await?;
    Ok(ResponseJson(ApiResponse::success(filters.apply(tasks))))
}

pub async fn create_task(
    Extension(organisation): Extension<Organisation>,
    State(state): State<AppState>,
    ActingPerson(creator): ActingPerson,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating task '{}' in organisation {}",
        payload.title,
        organisation.id
    );

    let task = Task::create(&state.db().conn, organisation.id, &payload, creator.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub stage: Option<TaskStage>,
    pub due_date: Option<NaiveDate>,
    pub requires_approval: Option<bool>,
    pub assignee_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub expected_version: Option<i64>,
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    State(state): State<AppState>,
    ActingPerson(_editor): ActingPerson,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    // Use existing values if not provided in update
    let title = payload.title.unwrap_or(existing_task.title.clone());
    let description = match payload.description {
        Some(s) if s.trim().is_empty() => None, // Empty string = clear description
        Some(s) => Some(s),                     // Non-empty string = update description
        None => existing_task.description.clone(), // Field omitted = keep existing
    };
    let fields = UpdateTaskFields {
        title,
        description,
        priority: payload.priority.unwrap_or(existing_task.priority),
        category: payload.category.unwrap_or(existing_task.category),
        stage: payload.stage.unwrap_or(existing_task.stage),
        due_date: payload.due_date.or(existing_task.due_date),
        requires_approval: payload
            .requires_approval
            .unwrap_or(existing_task.requires_approval),
        assignee_id: payload.assignee_id.or(existing_task.assignee_id),
        client_id: payload.client_id.or(existing_task.client_id),
    };

    let task = Task::update_fields(
        &state.db().conn,
        existing_task.id,
        &fields,
        payload.expected_version,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

#[derive(Debug, Deserialize, TS)]
pub struct TransitionTaskRequest {
    pub stage: TaskStage,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expected_version: Option<i64>,
}

pub async fn transition_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    ActingPerson(performer): ActingPerson,
    Json(payload): Json<TransitionTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::transition_stage(
        &state.db().conn,
        task.id,
        payload.stage,
        performer.id,
        payload.notes,
        payload.metadata,
        payload.expected_version,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

#[derive(Debug, Deserialize, TS)]
pub struct AssignTaskRequest {
    pub assignee_id: Option<Uuid>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expected_version: Option<i64>,
}

pub async fn assign_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    ActingPerson(performer): ActingPerson,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::assign(
        &state.db().conn,
        task.id,
        payload.assignee_id,
        performer.id,
        payload.notes,
        payload.metadata,
        payload.expected_version,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn list_transitions(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskTransition>>>, ApiError> {
    let transitions = TaskTransition::find_by_task_id(&state.db().conn, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(transitions)))
}

/// List/create, mounted under an organisation by the organisations router.
pub fn org_scoped_router() -> Router<AppState> {
    Router::new().route("/tasks", get(get_tasks).post(create_task))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task))
        .route("/", put(update_task))
        .route("/transition", post(transition_task))
        .route("/assign", post(assign_task))
        .route("/transitions", get(list_transitions))
        .merge(routes::comments::router())
        .merge(routes::attachments::task_router())
        .layer(from_fn_with_state(
            state.clone(),
            load_task_middleware::<AppState>,
        ));

    Router::new().nest("/tasks/{task_id}", task_id_router)
}
