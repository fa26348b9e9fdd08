//! Authentication error types.
//!
//! Messages are part of the public API; clients match on them.

use pbcms_api::{ApiError, FieldError};
use pbcms_storage::StorageError;

use crate::token::JwtError;

/// Errors raised by login, refresh, registration and the request guards.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username and password required")]
    MissingCredentials,

    /// Unknown user, wrong password, locked or inactive account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access token required")]
    AccessTokenRequired,

    /// Access token failed verification. Clients refresh on this.
    #[error("Invalid or expired access token")]
    InvalidAccessToken,

    #[error("Refresh token not found")]
    RefreshTokenMissing,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Refresh token verified but is not the one on record.
    #[error("Invalid refresh token")]
    RefreshTokenMismatch,

    #[error("User not found")]
    UserNotFound,

    #[error("Account deactivated")]
    AccountDeactivated,

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Validation failed")]
    Validation { errors: Vec<FieldError> },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },
}

impl AuthError {
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn super_admin_required() -> Self {
        Self::forbidden("SuperAdmin access required")
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match ApiError::from(errors) {
            ApiError::Validation { errors, .. } => Self::Validation { errors },
            _ => Self::Validation { errors: Vec::new() },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingCredentials => ApiError::bad_request(message),
            AuthError::Validation { errors } => ApiError::validation(message, errors),
            AuthError::InvalidAccessToken => ApiError::token_expired(message),
            AuthError::InvalidCredentials
            | AuthError::AccessTokenRequired
            | AuthError::RefreshTokenMissing
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshTokenMismatch
            | AuthError::UserNotFound => ApiError::unauthorized(message),
            AuthError::AccountDeactivated | AuthError::Forbidden { .. } => {
                ApiError::forbidden(message)
            }
            AuthError::Conflict { .. } => ApiError::conflict(message),
            AuthError::Storage(_) | AuthError::Token(_) | AuthError::PasswordHash { .. } => {
                tracing::error!(error = %message, "Authentication failure");
                ApiError::internal(message)
            }
        }
    }
}

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
