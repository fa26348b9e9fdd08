//! Dashboard summaries for the two admin roles.

use std::sync::Arc;

use pbcms_core::{AdminListItem, Role};
use pbcms_storage::AdminStorage;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheBackend, keys, views};
use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccounts {
    pub count: usize,
    pub list: Vec<AdminListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperAdminDashboard {
    pub admins: AdminAccounts,
    pub total_admins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_admins: u64,
}

#[derive(Clone)]
pub struct Dashboard {
    storage: Arc<dyn AdminStorage>,
    cache: CacheBackend,
}

impl Dashboard {
    pub fn new(storage: Arc<dyn AdminStorage>, cache: CacheBackend) -> Self {
        Self { storage, cache }
    }

    pub async fn super_admin(&self) -> AppResult<SuperAdminDashboard> {
        let (list, total_admins) = tokio::try_join!(self.admins(), self.total_admins())?;
        Ok(SuperAdminDashboard {
            admins: AdminAccounts {
                count: list.len(),
                list,
            },
            total_admins,
        })
    }

    pub async fn admin(&self) -> AppResult<AdminDashboard> {
        Ok(AdminDashboard {
            total_admins: self.total_admins().await?,
        })
    }

    /// Drop cached admin views after an account change.
    pub async fn invalidate(&self) {
        self.cache.invalidate_views(&views::ADMIN_WRITES).await;
    }

    async fn admins(&self) -> AppResult<Vec<AdminListItem>> {
        let key = keys::admins().to_string();
        self.cache
            .get_cached_data(&key, views::ADMINS.ttl, || {
                load_admins(self.storage.as_ref())
            })
            .await
    }

    async fn total_admins(&self) -> AppResult<u64> {
        let key = keys::total_admins().to_string();
        self.cache
            .get_cached_data(&key, views::TOTAL_ADMINS.ttl, || {
                count_admins(self.storage.as_ref())
            })
            .await
    }
}

async fn count_admins(storage: &dyn AdminStorage) -> AppResult<u64> {
    Ok(storage.count_admins_by_role(Role::Admin).await?)
}

async fn load_admins(storage: &dyn AdminStorage) -> AppResult<Vec<AdminListItem>> {
    let admins = storage.list_admins_by_role(Role::Admin).await?;
    Ok(admins.iter().map(|a| a.list_item()).collect())
}
