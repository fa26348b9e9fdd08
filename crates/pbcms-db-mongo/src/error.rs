//! Error types for the MongoDB storage backend.

use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use pbcms_storage::StorageError;

/// Server error code for a unique index violation.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors specific to the MongoDB storage backend.
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    /// Driver or server error.
    #[error("MongoDB error: {0}")]
    Driver(#[from] DriverError),

    /// A document could not be mapped to or from a domain record.
    #[error("Mapping error: {message}")]
    Mapping { message: String },

    /// All connection attempts failed.
    #[error("Failed to connect to MongoDB after {attempts} attempts: {message}")]
    Unreachable { attempts: u32, message: String },
}

impl MongoError {
    #[must_use]
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }
}

impl From<MongoError> for StorageError {
    fn from(err: MongoError) -> Self {
        match err {
            MongoError::Driver(e) if is_connection_error(&e) => {
                StorageError::connection_error(e.to_string())
            }
            MongoError::Driver(e) => StorageError::internal(e.to_string()),
            MongoError::Mapping { message } => StorageError::invalid_record(message),
            MongoError::Unreachable { attempts, message } => StorageError::connection_error(
                format!("Failed to connect to MongoDB after {attempts} attempts: {message}"),
            ),
        }
    }
}

/// Credentials were rejected; retrying cannot help.
pub fn is_auth_error(err: &DriverError) -> bool {
    matches!(*err.kind, ErrorKind::Authentication { .. })
}

fn is_connection_error(err: &DriverError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. }
    )
}

/// Server message of a duplicate-key write error, if this is one.
pub fn duplicate_key_message(err: &DriverError) -> Option<&str> {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            Some(write_error.message.as_str())
        }
        _ => None,
    }
}

/// Map a write failure, naming which of `unique_fields` collided.
///
/// The server reports the violated index as `index: <field>_1 dup key`.
pub fn map_write_error(
    err: DriverError,
    collection: &str,
    unique_fields: &[(&str, &str)],
) -> StorageError {
    if let Some(message) = duplicate_key_message(&err) {
        let hit = unique_fields
            .iter()
            .find(|(field, _)| message.contains(&format!("{field}_1")))
            .or_else(|| unique_fields.first());
        if let Some((field, value)) = hit {
            return StorageError::already_exists(collection, *field, *value);
        }
    }
    MongoError::Driver(err).into()
}

/// Result type alias for MongoDB operations.
pub type Result<T> = std::result::Result<T, MongoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_becomes_invalid_record() {
        let err: StorageError = MongoError::mapping("bad object id").into();
        assert!(matches!(err, StorageError::InvalidRecord { .. }));
    }

    #[test]
    fn unreachable_becomes_connection_error() {
        let err: StorageError = MongoError::Unreachable {
            attempts: 5,
            message: "timed out".into(),
        }
        .into();
        assert!(matches!(err, StorageError::ConnectionError { .. }));
        assert!(err.to_string().contains("after 5 attempts"));
    }
}
