use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::batch::BatchError;
use crate::pdf::PdfError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Job {id} not found")),
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Serialization(msg) => {
                AppError::Internal(anyhow::anyhow!("Stored job is malformed: {msg}"))
            }
        }
    }
}

impl From<BatchError> for AppError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::ConfigMissing | BatchError::NoData => AppError::Validation(e.to_string()),
            BatchError::AlreadyRunning { .. }
            | BatchError::JobFinished { .. }
            | BatchError::JobAlreadyStarted(_) => AppError::Conflict(e.to_string()),
            BatchError::JobNotFound(_) => AppError::NotFound(e.to_string()),
            BatchError::Gateway(e) => AppError::Llm(e.to_string()),
            BatchError::Store(e) => e.into(),
        }
    }
}

impl From<PdfError> for AppError {
    fn from(e: PdfError) -> Self {
        AppError::UnprocessableEntity(e.to_string())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
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
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use uuid::Uuid;

    #[test]
    fn test_batch_errors_map_to_http_status() {
        let job_id = Uuid::new_v4();
        let cases = [
            (BatchError::AlreadyRunning { job_id }, StatusCode::CONFLICT),
            (BatchError::NoData, StatusCode::BAD_REQUEST),
            (
                BatchError::JobFinished {
                    job_id,
                    status: JobStatus::Stopped,
                },
                StatusCode::CONFLICT,
            ),
            (BatchError::ConfigMissing, StatusCode::BAD_REQUEST),
            (BatchError::JobNotFound(job_id), StatusCode::NOT_FOUND),
            (
                BatchError::Store(StoreError::NotFound(job_id)),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, expected) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_pdf_errors_are_unprocessable() {
        let response = AppError::from(PdfError::NoText).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
