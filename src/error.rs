// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::review::ReviewError;

/// Every failure a handler can return; each variant maps to one status code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("one or more tags not found")]
    TagNotFound,

    #[error("you have already reviewed this course")]
    DuplicateReview,

    #[error("invalid or expired token")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("too many requests")]
    RateLimited,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Invalid(e) => AppError::Validation(e.to_string()),
            ReviewError::CourseNotFound => AppError::NotFound("Course not found"),
            ReviewError::DuplicateReview => AppError::DuplicateReview,
            ReviewError::TagNotFound => AppError::TagNotFound,
            ReviewError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::TagNotFound => StatusCode::BAD_REQUEST,
            AppError::DuplicateReview => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
