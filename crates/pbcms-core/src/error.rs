use thiserror::Error;

/// Core error types for pbcms domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid icon name: {0}")]
    InvalidIcon(String),

    #[error("Invalid timestamp: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),
}

impl CoreError {
    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new InvalidRole error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Create a new InvalidIcon error
    pub fn invalid_icon(icon: impl Into<String>) -> Self {
        Self::InvalidIcon(icon.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
