pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod observability;
pub mod server;

pub use cache::{CacheBackend, CachedEntry, create_cache_backend};
pub use config::{AppConfig, Environment, RedisConfig, ServerConfig, StorageBackend};
pub use error::{AppError, AppResult};
pub use media::{MediaStore, MemoryMediaStore, create_media_store};
pub use server::{AppState, PbcmsServer, ServerBuilder, Stores, build_app};
