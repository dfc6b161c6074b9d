use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    TransactionTrait,
    models::{
        connection::{Connection, CreateConnection},
        organisation::{CreateOrganisation, Organisation},
        person::PersonSummary,
    },
};
use services::services::members::resolve_organisation_members;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_organisation_middleware, routes};

pub async fn create_organisation(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrganisation>,
) -> Result<ResponseJson<ApiResponse<Organisation>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Organisation name must not be empty".to_string(),
        ));
    }

    // The organisation row and its member group land together.
    let tx = state.db().conn.begin().await?;
    let organisation = Organisation::create(&tx, &payload, Uuid::new_v4()).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(organisation)))
}

pub async fn get_organisation(
    Extension(organisation): Extension<Organisation>,
) -> Result<ResponseJson<ApiResponse<Organisation>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(organisation)))
}

pub async fn get_members(
    Extension(organisation): Extension<Organisation>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<PersonSummary>>>, ApiError> {
    let members = resolve_organisation_members(state.db(), organisation.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn create_connection(
    Extension(organisation): Extension<Organisation>,
    State(state): State<AppState>,
    Json(payload): Json<CreateConnection>,
) -> Result<ResponseJson<ApiResponse<Connection>>, ApiError> {
    let connection =
        Connection::create(&state.db().conn, organisation.member_group_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(connection)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let organisation_id_router = Router::new()
        .route("/", get(get_organisation))
        .route("/members", get(get_members))
        .route("/connections", post(create_connection))
        .merge(routes::tasks::org_scoped_router())
        .layer(from_fn_with_state(
            state.clone(),
            load_organisation_middleware::<AppState>,
        ));

    Router::new()
        .route("/organisations", post(create_organisation))
        .nest("/organisations/{organisation_id}", organisation_id_router)
}
