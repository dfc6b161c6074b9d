use axum::{
    Extension, Router,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use db::models::{attachment::Attachment, task::Task};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::ActingPerson};

pub async fn list_attachments(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Attachment>>>, ApiError> {
    let attachments = state.attachments().list(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(attachments)))
}

pub async fn upload_attachment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    ActingPerson(uploader): ActingPerson,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Attachment>>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "file".to_string());
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let attachment = state
            .attachments()
            .upload(task.id, &bytes, &file_name, mime_type, uploader.id)
            .await?;
        return Ok(ResponseJson(ApiResponse::success(attachment)));
    }

    Err(ApiError::BadRequest(
        "Upload requires a file field".to_string(),
    ))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    Path(attachment_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (attachment, bytes) = state.attachments().download(attachment_id).await?;

    let content_type = attachment.mime_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&attachment.file_name)
            .first_or_octet_stream()
            .to_string()
    });
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace('"', "_")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response())
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    ActingPerson(_remover): ActingPerson,
    Path(attachment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.attachments().delete(attachment_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Upload/list, mounted inside the task-id router behind the task loader.
pub fn task_router() -> Router<AppState> {
    Router::new().route("/attachments", get(list_attachments).post(upload_attachment))
}

/// Download/delete by attachment id.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/attachments/{attachment_id}",
        get(download_attachment).delete(delete_attachment),
    )
}
