//! Storage traits that every backend implements.

use async_trait::async_trait;
use pbcms_core::{Admin, Banner, Role, Service};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::types::{BannerQuery, DisplayOrder, Page, ServiceQuery};

/// Administrator accounts.
///
/// Usernames and emails are unique and stored lowercase; lookups expect
/// already-normalized input.
#[async_trait]
pub trait AdminStorage: Send + Sync {
    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` naming `email` or `username`
    /// when either is taken, or `role` when `admin` is a super admin and
    /// one is already stored. The role check is atomic with the insert.
    async fn insert_admin(&self, admin: &Admin) -> Result<(), StorageError>;

    async fn find_admin_by_id(&self, id: &str) -> Result<Option<Admin>, StorageError>;

    async fn find_admin_by_username(&self, username: &str)
    -> Result<Option<Admin>, StorageError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError>;

    /// Total number of accounts regardless of role.
    async fn count_admins(&self) -> Result<u64, StorageError>;

    async fn count_admins_by_role(&self, role: Role) -> Result<u64, StorageError>;

    async fn list_admins_by_role(&self, role: Role) -> Result<Vec<Admin>, StorageError>;

    /// Successful login: store the new refresh token, clear lockout state
    /// and stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the account does not exist.
    async fn record_login(
        &self,
        id: &str,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StorageError>;

    /// Persist failed-login bookkeeping.
    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<OffsetDateTime>,
    ) -> Result<(), StorageError>;

    /// Replace the stored refresh token only if it still equals `expected`.
    ///
    /// Returns `false` when the stored value differs (already rotated or
    /// revoked), in which case nothing is written.
    async fn rotate_refresh_token(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StorageError>;

    /// Revoke the stored refresh token. Missing accounts are not an error.
    async fn clear_refresh_token(&self, id: &str) -> Result<(), StorageError>;
}

/// Services catalog.
#[async_trait]
pub trait ServiceStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` on a duplicate slug.
    async fn insert_service(&self, service: &Service) -> Result<(), StorageError>;

    async fn find_service_by_id(&self, id: &str) -> Result<Option<Service>, StorageError>;

    /// Looks up by slug regardless of publication state.
    async fn find_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError>;

    /// Overwrites the stored record with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is gone and
    /// `StorageError::AlreadyExists` if the new slug collides.
    async fn replace_service(&self, service: &Service) -> Result<(), StorageError>;

    /// Returns `false` if nothing was deleted.
    async fn delete_service(&self, id: &str) -> Result<bool, StorageError>;

    /// Published services ordered by `display_order` ascending then newest first.
    async fn list_published_services(
        &self,
        show_on_homepage: Option<bool>,
    ) -> Result<Vec<Service>, StorageError>;

    /// Admin listing. With a search term results are ordered by relevance,
    /// otherwise like [`ServiceStorage::list_published_services`].
    async fn query_services(&self, query: &ServiceQuery) -> Result<Page<Service>, StorageError>;

    /// Bump `view_count` and stamp `last_viewed_at`.
    async fn record_service_view(&self, id: &str, at: OffsetDateTime)
    -> Result<(), StorageError>;

    /// Apply display orders; unknown ids are skipped. Returns how many
    /// records matched.
    async fn set_display_orders(&self, orders: &[DisplayOrder]) -> Result<u64, StorageError>;
}

/// Promotional banners.
#[async_trait]
pub trait BannerStorage: Send + Sync {
    async fn insert_banner(&self, banner: &Banner) -> Result<(), StorageError>;

    async fn find_banner_by_id(&self, id: &str) -> Result<Option<Banner>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is gone.
    async fn replace_banner(&self, banner: &Banner) -> Result<(), StorageError>;

    async fn delete_banner(&self, id: &str) -> Result<bool, StorageError>;

    /// Most recently created active banner.
    async fn latest_active_banner(&self) -> Result<Option<Banner>, StorageError>;

    /// Newest first.
    async fn query_banners(&self, query: &BannerQuery) -> Result<Page<Banner>, StorageError>;
}
