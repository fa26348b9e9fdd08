//! In-memory storage backend for the pbcms content server.
//!
//! Implements every storage trait from `pbcms-storage` over plain maps
//! guarded by tokio locks. Used by tests and for running the server without
//! a database.
//!
//! # Example
//!
//! ```ignore
//! use pbcms_db_memory::InMemoryStorage;
//! use pbcms_storage::AdminStorage;
//!
//! let storage = InMemoryStorage::new();
//! assert_eq!(storage.count_admins().await?, 0);
//! ```

mod query;
pub mod storage;

pub use pbcms_storage::{AdminStorage, BannerStorage, ServiceStorage, StorageError};
pub use storage::InMemoryStorage;

/// Creates a shareable in-memory backend.
pub fn create_memory_storage() -> std::sync::Arc<InMemoryStorage> {
    std::sync::Arc::new(InMemoryStorage::new())
}
