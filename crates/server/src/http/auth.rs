use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::person::Person;
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Header carrying the authenticated person id, stamped by the session
/// gateway in front of this service.
pub const ACTING_PERSON_HEADER: &str = "x-acting-person";

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) Authorization: Bearer <token>
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) X-API-Token: <token>
    if let Some(value) = req
        .headers()
        .get("x-api-token")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Some(value.to_string());
    }

    None
}

pub async fn require_api_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected_token) = state.api_token() else {
        return next.run(req).await;
    };

    let presented = extract_request_token(&req);
    if presented.as_deref() != Some(expected_token) {
        let reason = if presented.is_none() {
            "missing_token"
        } else {
            "token_mismatch"
        };
        tracing::warn!(
            path = %req.uri().path(),
            method = %req.method(),
            reason,
            "Unauthorized API request"
        );

        let response = ApiResponse::<()>::error("Unauthorized");
        return (axum::http::StatusCode::UNAUTHORIZED, Json(response)).into_response();
    }

    next.run(req).await
}

/// The authenticated person performing a mutating call. Extraction fails
/// with 401 before any handler code runs, so no write is attempted without
/// a resolvable identity.
pub struct ActingPerson(pub Person);

impl FromRequestParts<AppState> for ActingPerson {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTING_PERSON_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let person_id = Uuid::parse_str(raw).map_err(|_| ApiError::Unauthorized)?;
        let person = Person::find_by_id(&state.db().conn, person_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self(person))
    }
}
