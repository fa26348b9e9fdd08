//! MongoDB storage backend for the pbcms content server.
//!
//! Documents keep the camelCase field layout of the existing `admins`,
//! `services` and `calltoactions` collections.
//!
//! # Example
//!
//! ```ignore
//! use pbcms_db_mongo::{MongoConfig, connect_storage};
//!
//! let storage = connect_storage(&MongoConfig::new("mongodb://localhost:27017/pbcms")).await?;
//! ```

mod config;
mod documents;
mod error;
mod pool;
mod schema;
mod storage;

pub use config::MongoConfig;
pub use error::{MongoError, Result};
pub use pool::{backoff_delay, connect};
pub use schema::{SERVICE_SEARCH_INDEX, ensure_indexes};
pub use storage::MongoStorage;

/// Connects with retry, ensures indexes when configured and wraps the
/// database in a [`MongoStorage`].
pub async fn connect_storage(config: &MongoConfig) -> Result<MongoStorage> {
    let db = connect(config).await?;
    if config.ensure_indexes {
        ensure_indexes(&db).await?;
    }
    Ok(MongoStorage::new(db))
}
