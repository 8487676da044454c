use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::parser::ParseError;
use crate::pipeline::PipelineError;
use crate::queue::QueueError;
use crate::resumes::upload::UploadError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ResumeNotFound(id) => AppError::NotFound(format!("resume {id}")),
            PipelineError::RequirementNotFound(id) => {
                AppError::NotFound(format!("requirement {id}"))
            }
            PipelineError::RequirementNotOwned(_) => AppError::Forbidden,
            PipelineError::MissingRequirement => AppError::Validation(
                "either `requirements` or `requirement_id` must be provided".to_string(),
            ),
            PipelineError::Store(e) => AppError::Store(e),
            PipelineError::Transition(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Upload(err) => upload_status(err),
            AppError::Parse(err) => {
                tracing::warn!("Document parse failed: {err}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PARSE_ERROR",
                    err.to_string(),
                )
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Queue(err) => {
                tracing::error!("Queue error: {err}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "QUEUE_UNAVAILABLE",
                    "The task queue is unavailable".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn upload_status(err: &UploadError) -> (StatusCode, &'static str, String) {
    match err {
        UploadError::UnsupportedExtension(_) | UploadError::MissingField(_) => {
            (StatusCode::BAD_REQUEST, "UPLOAD_REJECTED", err.to_string())
        }
        UploadError::TooLarge { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE", err.to_string())
        }
        UploadError::Parse(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "PARSE_ERROR",
            e.to_string(),
        ),
        UploadError::Write(e) => {
            tracing::error!("Upload write failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPLOAD_FAILED",
                "The file could not be stored".to_string(),
            )
        }
        UploadError::Store(e) => {
            tracing::error!("Store error during upload: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            )
        }
        UploadError::Task(e) => {
            tracing::error!("Upload task error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("resume".into()), StatusCode::NOT_FOUND),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Upload(UploadError::UnsupportedExtension("exe".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Upload(UploadError::TooLarge { limit: 10 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::Parse(ParseError::Docx("missing word/document.xml".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Store(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Queue(QueueError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_missing_resume_maps_to_not_found() {
        let err: AppError = PipelineError::ResumeNotFound(uuid::Uuid::nil()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
