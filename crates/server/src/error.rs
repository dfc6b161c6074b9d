use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        attachment::AttachmentError, comment::CommentError, connection::ConnectionError,
        organisation::OrganisationError, task::TaskError,
    },
};
use services::services::{attachment::AttachmentServiceError, members::MemberResolveError};
use thiserror::Error;
use utils_core::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Attachment(#[from] AttachmentServiceError),
    #[error(transparent)]
    Organisation(#[from] OrganisationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Members(#[from] MemberResolveError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        ApiError::Attachment(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Task(err) => match err {
                TaskError::NotFound | TaskError::OrganisationNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                TaskError::ValidationError(_) => (StatusCode::BAD_REQUEST, "TaskError"),
                TaskError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "TaskError"),
                TaskError::Conflict { .. } => (StatusCode::CONFLICT, "TaskError"),
                TaskError::Database(db_err) => match db_err {
                    DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "TaskError"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
                },
            },
            ApiError::Comment(err) => match err {
                CommentError::TaskNotFound => (StatusCode::NOT_FOUND, "CommentError"),
                CommentError::AuthorNotFound => (StatusCode::UNAUTHORIZED, "CommentError"),
                CommentError::ValidationError(_) => (StatusCode::BAD_REQUEST, "CommentError"),
                CommentError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CommentError")
                }
            },
            ApiError::Attachment(err) => match err {
                AttachmentServiceError::NotFound | AttachmentServiceError::TaskNotFound => {
                    (StatusCode::NOT_FOUND, "AttachmentError")
                }
                AttachmentServiceError::UploaderNotFound => {
                    (StatusCode::UNAUTHORIZED, "AttachmentError")
                }
                AttachmentServiceError::TooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "AttachmentTooLarge")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AttachmentError"),
            },
            ApiError::Organisation(err) => match err {
                OrganisationError::NotFound => (StatusCode::NOT_FOUND, "OrganisationError"),
                OrganisationError::OwnerNotFound => {
                    (StatusCode::BAD_REQUEST, "OrganisationError")
                }
                OrganisationError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "OrganisationError")
                }
            },
            ApiError::Connection(err) => match err {
                ConnectionError::GroupNotFound => (StatusCode::NOT_FOUND, "ConnectionError"),
                ConnectionError::PersonNotFound => (StatusCode::BAD_REQUEST, "ConnectionError"),
                ConnectionError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ConnectionError")
                }
            },
            ApiError::Members(err) => match err {
                MemberResolveError::OrganisationNotFound => {
                    (StatusCode::NOT_FOUND, "MemberResolveError")
                }
                MemberResolveError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "MemberResolveError")
                }
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MultipartError"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
        };

        let error_message = match &self {
            ApiError::Attachment(AttachmentServiceError::TooLarge { size, max }) => format!(
                "This file is too large ({:.1} MB). Maximum file size is {:.1} MB.",
                *size as f64 / 1_048_576.0,
                *max as f64 / 1_048_576.0
            ),
            ApiError::Multipart(_) => {
                "Failed to upload file. Please ensure the file is valid and try again.".to_string()
            }
            ApiError::Unauthorized => "Unauthorized. Please sign in again.".to_string(),
            ApiError::NotFound(msg) | ApiError::Internal(msg) | ApiError::BadRequest(msg) => {
                msg.clone()
            }
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
