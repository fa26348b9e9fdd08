use crate::query::{catalog_order, run_banner_query, run_service_query};
use async_trait::async_trait;
use pbcms_core::{Admin, Banner, Role, Service};
use pbcms_storage::{
    AdminStorage, BannerQuery, BannerStorage, DisplayOrder, Page, ServiceQuery, ServiceStorage,
    StorageError, collections,
};
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend.
///
/// One lock per collection; unique-field checks and the write they guard
/// happen under the same write lock.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    admins: RwLock<HashMap<String, Admin>>,
    services: RwLock<HashMap<String, Service>>,
    banners: RwLock<HashMap<String, Banner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStorage for InMemoryStorage {
    async fn insert_admin(&self, admin: &Admin) -> Result<(), StorageError> {
        let mut admins = self.admins.write().await;
        if admins.values().any(|a| a.email == admin.email) {
            return Err(StorageError::already_exists(
                collections::ADMINS,
                "email",
                &admin.email,
            ));
        }
        if admins.values().any(|a| a.username == admin.username) {
            return Err(StorageError::already_exists(
                collections::ADMINS,
                "username",
                &admin.username,
            ));
        }
        if admin.role.is_super_admin() && admins.values().any(|a| a.role.is_super_admin()) {
            return Err(StorageError::already_exists(
                collections::ADMINS,
                "role",
                admin.role.as_str(),
            ));
        }
        admins.insert(admin.id.clone(), admin.clone());
        Ok(())
    }

    async fn find_admin_by_id(&self, id: &str) -> Result<Option<Admin>, StorageError> {
        Ok(self.admins.read().await.get(id).cloned())
    }

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Admin>, StorageError> {
        Ok(self
            .admins
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError> {
        Ok(self
            .admins
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn count_admins(&self) -> Result<u64, StorageError> {
        Ok(self.admins.read().await.len() as u64)
    }

    async fn count_admins_by_role(&self, role: Role) -> Result<u64, StorageError> {
        Ok(self
            .admins
            .read()
            .await
            .values()
            .filter(|a| a.role == role)
            .count() as u64)
    }

    async fn list_admins_by_role(&self, role: Role) -> Result<Vec<Admin>, StorageError> {
        let mut admins: Vec<Admin> = self
            .admins
            .read()
            .await
            .values()
            .filter(|a| a.role == role)
            .cloned()
            .collect();
        admins.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(admins)
    }

    async fn record_login(
        &self,
        id: &str,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let mut admins = self.admins.write().await;
        let admin = admins
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(collections::ADMINS, id))?;
        admin.refresh_token = Some(refresh_token.to_string());
        admin.login_attempts = 0;
        admin.lock_until = None;
        admin.last_login = Some(at);
        admin.updated_at = at;
        Ok(())
    }

    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<OffsetDateTime>,
    ) -> Result<(), StorageError> {
        let mut admins = self.admins.write().await;
        let admin = admins
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(collections::ADMINS, id))?;
        admin.login_attempts = attempts;
        admin.lock_until = lock_until;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StorageError> {
        let mut admins = self.admins.write().await;
        match admins.get_mut(id) {
            Some(admin) if admin.refresh_token.as_deref() == Some(expected) => {
                admin.refresh_token = Some(replacement.to_string());
                admin.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_token(&self, id: &str) -> Result<(), StorageError> {
        if let Some(admin) = self.admins.write().await.get_mut(id) {
            admin.refresh_token = None;
            admin.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceStorage for InMemoryStorage {
    async fn insert_service(&self, service: &Service) -> Result<(), StorageError> {
        let mut services = self.services.write().await;
        if services.values().any(|s| s.slug == service.slug) {
            return Err(StorageError::already_exists(
                collections::SERVICES,
                "slug",
                &service.slug,
            ));
        }
        services.insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn find_service_by_id(&self, id: &str) -> Result<Option<Service>, StorageError> {
        Ok(self.services.read().await.get(id).cloned())
    }

    async fn find_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError> {
        Ok(self
            .services
            .read()
            .await
            .values()
            .find(|s| s.slug == slug)
            .cloned())
    }

    async fn replace_service(&self, service: &Service) -> Result<(), StorageError> {
        let mut services = self.services.write().await;
        if !services.contains_key(&service.id) {
            return Err(StorageError::not_found(collections::SERVICES, &service.id));
        }
        if services
            .values()
            .any(|s| s.slug == service.slug && s.id != service.id)
        {
            return Err(StorageError::already_exists(
                collections::SERVICES,
                "slug",
                &service.slug,
            ));
        }
        services.insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.services.write().await.remove(id).is_some())
    }

    async fn list_published_services(
        &self,
        show_on_homepage: Option<bool>,
    ) -> Result<Vec<Service>, StorageError> {
        let mut services: Vec<Service> = self
            .services
            .read()
            .await
            .values()
            .filter(|s| s.is_published)
            .filter(|s| show_on_homepage.is_none_or(|flag| s.show_on_homepage == flag))
            .cloned()
            .collect();
        services.sort_by(catalog_order);
        Ok(services)
    }

    async fn query_services(&self, query: &ServiceQuery) -> Result<Page<Service>, StorageError> {
        let services: Vec<Service> = self.services.read().await.values().cloned().collect();
        Ok(run_service_query(services, query))
    }

    async fn record_service_view(
        &self,
        id: &str,
        at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let mut services = self.services.write().await;
        let service = services
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(collections::SERVICES, id))?;
        service.view_count += 1;
        service.last_viewed_at = Some(at);
        Ok(())
    }

    async fn set_display_orders(&self, orders: &[DisplayOrder]) -> Result<u64, StorageError> {
        let mut services = self.services.write().await;
        let mut matched = 0;
        for order in orders {
            if let Some(service) = services.get_mut(&order.service_id) {
                service.display_order = order.display_order;
                matched += 1;
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl BannerStorage for InMemoryStorage {
    async fn insert_banner(&self, banner: &Banner) -> Result<(), StorageError> {
        self.banners
            .write()
            .await
            .insert(banner.id.clone(), banner.clone());
        Ok(())
    }

    async fn find_banner_by_id(&self, id: &str) -> Result<Option<Banner>, StorageError> {
        Ok(self.banners.read().await.get(id).cloned())
    }

    async fn replace_banner(&self, banner: &Banner) -> Result<(), StorageError> {
        let mut banners = self.banners.write().await;
        match banners.get_mut(&banner.id) {
            Some(slot) => {
                *slot = banner.clone();
                Ok(())
            }
            None => Err(StorageError::not_found(collections::BANNERS, &banner.id)),
        }
    }

    async fn delete_banner(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.banners.write().await.remove(id).is_some())
    }

    async fn latest_active_banner(&self) -> Result<Option<Banner>, StorageError> {
        Ok(self
            .banners
            .read()
            .await
            .values()
            .filter(|b| b.is_active)
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn query_banners(&self, query: &BannerQuery) -> Result<Page<Banner>, StorageError> {
        let banners: Vec<Banner> = self.banners.read().await.values().cloned().collect();
        Ok(run_banner_query(banners, query))
    }
}
