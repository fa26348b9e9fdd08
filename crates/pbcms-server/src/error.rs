//! Handler error type.
//!
//! Every crate keeps its own error enum; handlers return [`AppError`] so `?`
//! works on all of them and the response is always rendered through
//! [`ApiError`].

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pbcms_api::ApiError;
use pbcms_auth::AuthError;
use pbcms_core::CoreError;
use pbcms_storage::StorageError;
use validator::ValidationErrors;

use crate::media::MediaError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Api(e) => e,
            AppError::Auth(e) => e.into(),
            AppError::Media(e) => e.into(),
            AppError::Validation(e) => e.into(),
            AppError::Core(e) => ApiError::bad_request(e.to_string()),
            AppError::Storage(e) => storage_to_api(e),
        }
    }
}

fn storage_to_api(err: StorageError) -> ApiError {
    match &err {
        StorageError::NotFound { .. } => ApiError::not_found(err.to_string()),
        StorageError::AlreadyExists { field, .. } => {
            ApiError::conflict(format!("Duplicate value for {field}"))
        }
        StorageError::InvalidId { .. } => ApiError::bad_request(err.to_string()),
        _ => {
            tracing::error!(error = %err, category = ?err.category(), "storage failure");
            ApiError::internal("Internal server error")
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text()).into()
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request(rejection.body_text()).into()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(err.body_text()).into()
        } else {
            ApiError::bad_request(err.body_text()).into()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
