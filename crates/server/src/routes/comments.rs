use axum::{
    Extension, Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    comment::{Comment, CreateComment},
    task::Task,
};
use utils_core::response::ApiResponse;

use crate::{AppState, error::ApiError, http::auth::ActingPerson};

pub async fn list_comments(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    let comments = Comment::find_by_task_id(&state.db().conn, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

pub async fn create_comment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    ActingPerson(author): ActingPerson,
    Json(payload): Json<CreateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let comment = Comment::create(&state.db().conn, task.id, author.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

/// Mounted inside the task-id router, behind the task loader.
pub fn router() -> Router<AppState> {
    Router::new().route("/comments", get(list_comments).post(create_comment))
}
