use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::person::{CreatePerson, Person};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn create_person(
    State(state): State<AppState>,
    Json(payload): Json<CreatePerson>,
) -> Result<ResponseJson<ApiResponse<Person>>, ApiError> {
    if payload.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Display name must not be empty".to_string(),
        ));
    }

    let person = Person::create(&state.db().conn, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(person)))
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(person_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Person>>, ApiError> {
    let person = Person::find_by_id(&state.db().conn, person_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(person)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/people", post(create_person))
        .route("/people/{person_id}", get(get_person))
}
