use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("invalid page")]
    InvalidPage,
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("malformed request body: {0}")]
    Payload(#[from] JsonRejection),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            },
            AppError::InvalidPage => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Invalid page." }))).into_response()
            },
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Authentication credentials were not provided." })),
            )
                .into_response(),
            AppError::Payload(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": rejection.body_text() })),
            )
                .into_response(),
            AppError::Db(err) => {
                tracing::error!(error = %err, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": err.to_string() })))
                    .into_response()
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
