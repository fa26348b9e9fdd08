//! MongoDB implementation of the storage traits.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Document, doc};
use mongodb::{Collection, Database};
use pbcms_core::{Admin, Banner, Role, Service};
use pbcms_storage::{
    AdminStorage, BannerQuery, BannerStorage, DisplayOrder, Page, ServiceQuery, ServiceStorage,
    StorageError, collections,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::documents::{AdminDocument, BannerDocument, ServiceDocument, to_bson_datetime};
use crate::error::{MongoError, map_write_error};

/// MongoDB storage backend.
///
/// Ids are hex `ObjectId`s. Lookups with a malformed id find nothing
/// rather than failing.
#[derive(Debug, Clone)]
pub struct MongoStorage {
    db: Database,
}

impl MongoStorage {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn admins(&self) -> Collection<AdminDocument> {
        self.db.collection(collections::ADMINS)
    }

    fn services(&self) -> Collection<ServiceDocument> {
        self.db.collection(collections::SERVICES)
    }

    fn banners(&self) -> Collection<BannerDocument> {
        self.db.collection(collections::BANNERS)
    }
}

fn object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn driver(err: mongodb::error::Error) -> StorageError {
    MongoError::Driver(err).into()
}

fn limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn catalog_sort() -> Document {
    doc! { "displayOrder": 1, "createdAt": -1 }
}

fn service_filter(query: &ServiceQuery) -> Document {
    let mut filter = Document::new();
    if let Some(flag) = query.status.as_flag() {
        filter.insert("isPublished", flag);
    }
    if let Some(flag) = query.show_on_homepage {
        filter.insert("showOnHomepage", flag);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filter.insert("$text", doc! { "$search": search });
    }
    filter
}

#[async_trait]
impl AdminStorage for MongoStorage {
    #[instrument(skip(self, admin), fields(username = %admin.username))]
    async fn insert_admin(&self, admin: &Admin) -> Result<(), StorageError> {
        let document = AdminDocument::from_admin(admin)?;
        self.admins().insert_one(document).await.map_err(|e| {
            map_write_error(
                e,
                collections::ADMINS,
                &[
                    ("email", &admin.email),
                    ("username", &admin.username),
                    ("role", admin.role.as_str()),
                ],
            )
        })?;
        Ok(())
    }

    async fn find_admin_by_id(&self, id: &str) -> Result<Option<Admin>, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        let found = self.admins().find_one(doc! { "_id": oid }).await.map_err(driver)?;
        Ok(found.map(AdminDocument::into_admin).transpose()?)
    }

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Admin>, StorageError> {
        let found = self
            .admins()
            .find_one(doc! { "username": username })
            .await
            .map_err(driver)?;
        Ok(found.map(AdminDocument::into_admin).transpose()?)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StorageError> {
        let found = self
            .admins()
            .find_one(doc! { "email": email })
            .await
            .map_err(driver)?;
        Ok(found.map(AdminDocument::into_admin).transpose()?)
    }

    async fn count_admins(&self) -> Result<u64, StorageError> {
        self.admins().count_documents(doc! {}).await.map_err(driver)
    }

    async fn count_admins_by_role(&self, role: Role) -> Result<u64, StorageError> {
        self.admins()
            .count_documents(doc! { "role": role.as_str() })
            .await
            .map_err(driver)
    }

    async fn list_admins_by_role(&self, role: Role) -> Result<Vec<Admin>, StorageError> {
        let documents: Vec<AdminDocument> = self
            .admins()
            .find(doc! { "role": role.as_str() })
            .sort(doc! { "createdAt": 1 })
            .await
            .map_err(driver)?
            .try_collect()
            .await
            .map_err(driver)?;
        documents
            .into_iter()
            .map(|d| d.into_admin().map_err(StorageError::from))
            .collect()
    }

    #[instrument(skip(self, refresh_token))]
    async fn record_login(
        &self,
        id: &str,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let oid = object_id(id).ok_or_else(|| StorageError::not_found(collections::ADMINS, id))?;
        let at = to_bson_datetime(at);
        let result = self
            .admins()
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$set": {
                        "refreshToken": refresh_token,
                        "loginAttempts": 0,
                        "lastLogin": at,
                        "updatedAt": at,
                    },
                    "$unset": { "lockUntil": "" },
                },
            )
            .await
            .map_err(driver)?;
        if result.matched_count == 0 {
            return Err(StorageError::not_found(collections::ADMINS, id));
        }
        Ok(())
    }

    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<OffsetDateTime>,
    ) -> Result<(), StorageError> {
        let oid = object_id(id).ok_or_else(|| StorageError::not_found(collections::ADMINS, id))?;
        let attempts = i32::try_from(attempts).unwrap_or(i32::MAX);
        let update = match lock_until {
            Some(until) => doc! {
                "$set": { "loginAttempts": attempts, "lockUntil": to_bson_datetime(until) },
            },
            None => doc! {
                "$set": { "loginAttempts": attempts },
                "$unset": { "lockUntil": "" },
            },
        };
        let result = self
            .admins()
            .update_one(doc! { "_id": oid }, update)
            .await
            .map_err(driver)?;
        if result.matched_count == 0 {
            return Err(StorageError::not_found(collections::ADMINS, id));
        }
        Ok(())
    }

    #[instrument(skip(self, expected, replacement))]
    async fn rotate_refresh_token(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let result = self
            .admins()
            .update_one(
                doc! { "_id": oid, "refreshToken": expected },
                doc! {
                    "$set": {
                        "refreshToken": replacement,
                        "updatedAt": to_bson_datetime(OffsetDateTime::now_utc()),
                    },
                },
            )
            .await
            .map_err(driver)?;
        Ok(result.modified_count == 1)
    }

    async fn clear_refresh_token(&self, id: &str) -> Result<(), StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(());
        };
        self.admins()
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$unset": { "refreshToken": "" },
                    "$set": { "updatedAt": to_bson_datetime(OffsetDateTime::now_utc()) },
                },
            )
            .await
            .map_err(driver)?;
        Ok(())
    }
}

#[async_trait]
impl ServiceStorage for MongoStorage {
    #[instrument(skip(self, service), fields(slug = %service.slug))]
    async fn insert_service(&self, service: &Service) -> Result<(), StorageError> {
        let document = ServiceDocument::from_service(service)?;
        self.services()
            .insert_one(document)
            .await
            .map_err(|e| map_write_error(e, collections::SERVICES, &[("slug", &service.slug)]))?;
        Ok(())
    }

    async fn find_service_by_id(&self, id: &str) -> Result<Option<Service>, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        let found = self
            .services()
            .find_one(doc! { "_id": oid })
            .await
            .map_err(driver)?;
        Ok(found.map(ServiceDocument::into_service).transpose()?)
    }

    async fn find_service_by_slug(&self, slug: &str) -> Result<Option<Service>, StorageError> {
        let found = self
            .services()
            .find_one(doc! { "slug": slug })
            .await
            .map_err(driver)?;
        Ok(found.map(ServiceDocument::into_service).transpose()?)
    }

    #[instrument(skip(self, service), fields(id = %service.id))]
    async fn replace_service(&self, service: &Service) -> Result<(), StorageError> {
        let document = ServiceDocument::from_service(service)?;
        let result = self
            .services()
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map_err(|e| map_write_error(e, collections::SERVICES, &[("slug", &service.slug)]))?;
        if result.matched_count == 0 {
            return Err(StorageError::not_found(collections::SERVICES, &service.id));
        }
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<bool, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let result = self
            .services()
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(driver)?;
        Ok(result.deleted_count > 0)
    }

    async fn list_published_services(
        &self,
        show_on_homepage: Option<bool>,
    ) -> Result<Vec<Service>, StorageError> {
        let mut filter = doc! { "isPublished": true };
        if let Some(flag) = show_on_homepage {
            filter.insert("showOnHomepage", flag);
        }
        let documents: Vec<ServiceDocument> = self
            .services()
            .find(filter)
            .sort(catalog_sort())
            .await
            .map_err(driver)?
            .try_collect()
            .await
            .map_err(driver)?;
        documents
            .into_iter()
            .map(|d| d.into_service().map_err(StorageError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn query_services(&self, query: &ServiceQuery) -> Result<Page<Service>, StorageError> {
        let filter = service_filter(query);
        let searching = filter.contains_key("$text");
        let sort = if searching {
            let mut sort = doc! { "score": { "$meta": "textScore" } };
            sort.extend(catalog_sort());
            sort
        } else {
            catalog_sort()
        };

        let total = self
            .services()
            .count_documents(filter.clone())
            .await
            .map_err(driver)?;
        let skip = query.pagination.skip();
        let documents: Vec<ServiceDocument> = self
            .services()
            .find(filter)
            .sort(sort)
            .skip(skip)
            .limit(limit(query.pagination.limit))
            .await
            .map_err(driver)?
            .try_collect()
            .await
            .map_err(driver)?;
        debug!(total, returned = documents.len(), searching, "Service query");

        let items = documents
            .into_iter()
            .map(|d| d.into_service().map_err(StorageError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total))
    }

    async fn record_service_view(
        &self,
        id: &str,
        at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let oid =
            object_id(id).ok_or_else(|| StorageError::not_found(collections::SERVICES, id))?;
        let result = self
            .services()
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$inc": { "viewCount": 1_i64 },
                    "$set": { "lastViewedAt": to_bson_datetime(at) },
                },
            )
            .await
            .map_err(driver)?;
        if result.matched_count == 0 {
            return Err(StorageError::not_found(collections::SERVICES, id));
        }
        Ok(())
    }

    #[instrument(skip(self, orders), fields(count = orders.len()))]
    async fn set_display_orders(&self, orders: &[DisplayOrder]) -> Result<u64, StorageError> {
        let now = to_bson_datetime(OffsetDateTime::now_utc());
        let mut matched = 0;
        for order in orders {
            let Some(oid) = object_id(&order.service_id) else {
                continue;
            };
            let result = self
                .services()
                .update_one(
                    doc! { "_id": oid },
                    doc! { "$set": { "displayOrder": order.display_order, "updatedAt": now } },
                )
                .await
                .map_err(driver)?;
            matched += result.matched_count;
        }
        Ok(matched)
    }
}

#[async_trait]
impl BannerStorage for MongoStorage {
    async fn insert_banner(&self, banner: &Banner) -> Result<(), StorageError> {
        let document = BannerDocument::from_banner(banner)?;
        self.banners().insert_one(document).await.map_err(driver)?;
        Ok(())
    }

    async fn find_banner_by_id(&self, id: &str) -> Result<Option<Banner>, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        let found = self
            .banners()
            .find_one(doc! { "_id": oid })
            .await
            .map_err(driver)?;
        Ok(found.map(BannerDocument::into_banner).transpose()?)
    }

    async fn replace_banner(&self, banner: &Banner) -> Result<(), StorageError> {
        let document = BannerDocument::from_banner(banner)?;
        let result = self
            .banners()
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map_err(driver)?;
        if result.matched_count == 0 {
            return Err(StorageError::not_found(collections::BANNERS, &banner.id));
        }
        Ok(())
    }

    async fn delete_banner(&self, id: &str) -> Result<bool, StorageError> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let result = self
            .banners()
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(driver)?;
        Ok(result.deleted_count > 0)
    }

    async fn latest_active_banner(&self) -> Result<Option<Banner>, StorageError> {
        let found = self
            .banners()
            .find_one(doc! { "isActive": true })
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(driver)?;
        Ok(found.map(BannerDocument::into_banner).transpose()?)
    }

    async fn query_banners(&self, query: &BannerQuery) -> Result<Page<Banner>, StorageError> {
        let mut filter = Document::new();
        if let Some(flag) = query.status.as_flag() {
            filter.insert("isActive", flag);
        }
        let total = self
            .banners()
            .count_documents(filter.clone())
            .await
            .map_err(driver)?;
        let skip = query.pagination.skip();
        let documents: Vec<BannerDocument> = self
            .banners()
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(limit(query.pagination.limit))
            .await
            .map_err(driver)?
            .try_collect()
            .await
            .map_err(driver)?;
        let items = documents
            .into_iter()
            .map(|d| d.into_banner().map_err(StorageError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total))
    }
}
