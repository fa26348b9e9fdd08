//! # pbcms-storage
//!
//! Storage abstraction layer for the pbcms content server.
//!
//! This crate defines the traits and types that all storage backends must
//! implement. It does not contain any implementations; `pbcms-db-memory` and
//! `pbcms-db-mongo` provide them.
//!
//! ## Example
//!
//! ```ignore
//! use pbcms_storage::{ServiceStorage, StorageError};
//!
//! async fn published_slug(
//!     storage: &dyn ServiceStorage,
//!     slug: &str,
//! ) -> Result<Option<pbcms_core::Service>, StorageError> {
//!     Ok(storage
//!         .find_service_by_slug(slug)
//!         .await?
//!         .filter(|s| s.is_published))
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{AdminStorage, BannerStorage, ServiceStorage};
pub use types::{
    BannerQuery, DEFAULT_PAGE_SIZE, DisplayOrder, MAX_PAGE_SIZE, Page, Pagination, ServiceQuery,
    StatusFilter,
};

/// Collection names shared by backends and error messages.
pub mod collections {
    pub const ADMINS: &str = "admins";
    pub const SERVICES: &str = "services";
    pub const BANNERS: &str = "calltoactions";
}
