//! Services catalog: public cards, the admin table and the write paths
//! that keep hero images in the folder matching their publication state.

use std::sync::Arc;

use pbcms_api::{ApiError, FieldError};
use pbcms_core::service::SHORT_DESCRIPTION_MIN;
use pbcms_core::{HeroImage, IconName, Seo, Service, ServiceSummary, generate_id, now_utc, slugify};
use pbcms_storage::{DisplayOrder, Page, ServiceQuery, ServiceStorage, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{form_flag, non_blank};
use crate::cache::{CacheBackend, keys, views};
use crate::error::{AppError, AppResult};
use crate::media::{ImageUpload, MediaStore, StoredImage, service_folder};

pub const SLUG_TAKEN: &str = "Service with this slug already exists";
const NOT_FOUND: &str = "Service not found";
const SHORT_DESCRIPTION_TOO_SHORT: &str = "Short description must be at least 50 characters";
const ORDER_ITEM_INVALID: &str = "Each item must have serviceId and displayOrder (number)";

/// Multipart fields of the create and update forms, as received.
#[derive(Debug, Default, Clone)]
pub struct ServiceForm {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub subtitle: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub icon_name: Option<String>,
    /// JSON array of strings.
    pub research_types: Option<String>,
    pub is_published: Option<String>,
    pub show_on_homepage: Option<String>,
    pub display_order: Option<String>,
    /// JSON object with `metaTitle`, `metaDescription`, `metaKeywords`.
    pub seo: Option<String>,
    pub hero_image: Option<ImageUpload>,
}

impl ServiceForm {
    /// Store a text part by its form name. Returns false for unknown names.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "slug" => &mut self.slug,
            "subtitle" => &mut self.subtitle,
            "shortDescription" => &mut self.short_description,
            "description" => &mut self.description,
            "iconName" => &mut self.icon_name,
            "researchTypes" => &mut self.research_types,
            "isPublished" => &mut self.is_published,
            "showOnHomepage" => &mut self.show_on_homepage,
            "displayOrder" => &mut self.display_order,
            "seo" => &mut self.seo,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_services: u64,
    pub limit: u64,
}

/// One page of the admin services table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListing {
    pub services: Vec<Service>,
    pub pagination: ServicePagination,
}

#[derive(Clone)]
pub struct ServiceCatalog {
    storage: Arc<dyn ServiceStorage>,
    cache: CacheBackend,
    media: Arc<dyn MediaStore>,
    max_upload_bytes: usize,
}

impl ServiceCatalog {
    pub fn new(
        storage: Arc<dyn ServiceStorage>,
        cache: CacheBackend,
        media: Arc<dyn MediaStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            storage,
            cache,
            media,
            max_upload_bytes,
        }
    }

    /// Published service cards, optionally only those shown on the homepage.
    pub async fn active(&self, show_on_homepage: Option<bool>) -> AppResult<Vec<ServiceSummary>> {
        let key = keys::active_services(show_on_homepage).to_string();
        self.cache
            .get_cached_data(&key, views::ACTIVE_SERVICES.ttl, || {
                load_summaries(self.storage.as_ref(), show_on_homepage)
            })
            .await
    }

    /// A published service by slug. Counts a view in the background.
    pub async fn by_slug(&self, slug: &str) -> AppResult<Service> {
        let slug = slug.trim().to_lowercase();
        let key = keys::service_by_slug(&slug).to_string();
        let service = self
            .cache
            .get_cached_data(&key, views::SERVICE_BY_SLUG.ttl, || {
                load_published(self.storage.as_ref(), &slug)
            })
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
        self.record_view(&service.id);
        Ok(service)
    }

    pub async fn list(&self, query: &ServiceQuery) -> AppResult<ServiceListing> {
        let key = keys::admin_services(query).to_string();
        self.cache
            .get_cached_data(&key, views::ADMIN_SERVICES.ttl, || {
                load_listing(self.storage.as_ref(), query)
            })
            .await
    }

    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn create(&self, form: ServiceForm, actor: &str) -> AppResult<Service> {
        let title = non_blank(form.title.as_deref())
            .ok_or_else(|| ApiError::bad_request("Title is required"))?;
        let slug = non_blank(form.slug.as_deref())
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return Err(ApiError::bad_request("Slug is required").into());
        }
        let short_description = form
            .short_description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if short_description.chars().count() < SHORT_DESCRIPTION_MIN {
            return Err(ApiError::bad_request(SHORT_DESCRIPTION_TOO_SHORT).into());
        }
        let description = non_blank(form.description.as_deref())
            .ok_or_else(|| ApiError::bad_request("Description is required"))?;
        let image = form
            .hero_image
            .ok_or_else(|| ApiError::bad_request("Hero image is required"))?;
        image.validate(self.max_upload_bytes)?;
        let research_types = form
            .research_types
            .as_deref()
            .map(parse_research_types)
            .transpose()?
            .unwrap_or_default();
        let seo = form
            .seo
            .as_deref()
            .map(parse_seo)
            .transpose()?
            .unwrap_or_default();
        let icon_name = non_blank(form.icon_name.as_deref())
            .map(|raw| parse_icon(&raw))
            .transpose()?
            .unwrap_or_default();

        let now = now_utc();
        let mut service = Service {
            id: generate_id(),
            title,
            slug,
            subtitle: non_blank(form.subtitle.as_deref()),
            short_description,
            description,
            icon_name,
            hero_image: HeroImage {
                url: String::new(),
                public_id: String::new(),
                width: None,
                height: None,
                format: "webp".to_string(),
                size: None,
            },
            research_types,
            is_published: form.is_published.as_deref().is_some_and(form_flag),
            show_on_homepage: form.show_on_homepage.as_deref().is_none_or(form_flag),
            display_order: form
                .display_order
                .as_deref()
                .map_or(0, parse_display_order),
            seo,
            view_count: 0,
            last_viewed_at: None,
            created_by: actor.to_string(),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        service.apply_seo_defaults();
        service.validate()?;

        if self
            .storage
            .find_service_by_slug(&service.slug)
            .await?
            .is_some()
        {
            return Err(ApiError::bad_request(SLUG_TAKEN).into());
        }

        let stored = self
            .media
            .upload(image.bytes, service_folder(service.is_published), &service.slug)
            .await?;
        service.hero_image = hero_image(stored);

        if let Err(e) = self.storage.insert_service(&service).await {
            self.discard_image(&service.hero_image.public_id).await;
            return Err(write_error(e));
        }

        self.invalidate().await;
        info!(service_id = %service.id, slug = %service.slug, "Service created");
        Ok(service)
    }

    #[instrument(skip_all, fields(service_id = %id, actor = %actor))]
    pub async fn update(&self, id: &str, form: ServiceForm, actor: &str) -> AppResult<Service> {
        if let Some(image) = &form.hero_image {
            image.validate(self.max_upload_bytes)?;
        }

        let title = provided(form.title.as_deref(), "Title cannot be empty")?;
        let slug = provided(form.slug.as_deref(), "Slug cannot be empty")?;
        let description = provided(form.description.as_deref(), "Description cannot be empty")?;
        let short_description = form.short_description.as_deref().map(str::trim);
        if short_description.is_some_and(|s| s.chars().count() < SHORT_DESCRIPTION_MIN) {
            return Err(ApiError::bad_request(SHORT_DESCRIPTION_TOO_SHORT).into());
        }
        let research_types = form
            .research_types
            .as_deref()
            .map(parse_research_types)
            .transpose()?;
        let seo = form.seo.as_deref().map(parse_seo).transpose()?;
        let icon_name = non_blank(form.icon_name.as_deref())
            .map(|raw| parse_icon(&raw))
            .transpose()?;

        let existing = self.find(id).await?;
        let mut service = existing.clone();

        if let Some(title) = title {
            if slug.is_none() && title != existing.title {
                let generated = slugify(&title);
                if !generated.is_empty() {
                    service.slug = generated;
                }
            }
            service.title = title;
        }
        if let Some(slug) = slug {
            service.slug = slug.to_lowercase();
        }
        if let Some(subtitle) = form.subtitle.as_deref() {
            service.subtitle = non_blank(Some(subtitle));
        }
        if let Some(short_description) = short_description {
            service.short_description = short_description.to_string();
        }
        if let Some(description) = description {
            service.description = description;
        }
        if let Some(icon_name) = icon_name {
            service.icon_name = icon_name;
        }
        if let Some(research_types) = research_types {
            service.research_types = research_types;
        }
        if let Some(raw) = form.is_published.as_deref() {
            service.is_published = form_flag(raw);
        }
        if let Some(raw) = form.show_on_homepage.as_deref() {
            service.show_on_homepage = form_flag(raw);
        }
        if let Some(raw) = form.display_order.as_deref() {
            service.display_order = parse_display_order(raw);
        }
        if let Some(seo) = seo {
            service.seo.merge(seo);
        }
        service.updated_by = Some(actor.to_string());
        service.updated_at = now_utc();
        service.apply_seo_defaults();
        service.validate()?;

        if service.slug != existing.slug
            && let Some(other) = self.storage.find_service_by_slug(&service.slug).await?
            && other.id != service.id
        {
            return Err(ApiError::bad_request(SLUG_TAKEN).into());
        }

        if let Some(image) = form.hero_image {
            self.discard_image(&existing.hero_image.public_id).await;
            let stored = self
                .media
                .upload(image.bytes, service_folder(service.is_published), &service.slug)
                .await?;
            service.hero_image = hero_image(stored);
        } else if service.is_published != existing.is_published {
            self.move_image(&mut service).await;
        }

        self.storage
            .replace_service(&service)
            .await
            .map_err(write_error)?;
        self.invalidate().await;
        info!(slug = %service.slug, "Service updated");
        Ok(service)
    }

    #[instrument(skip_all, fields(service_id = %id))]
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let service = self.find(id).await?;
        self.discard_image(&service.hero_image.public_id).await;
        if !self.storage.delete_service(id).await? {
            return Err(ApiError::not_found(NOT_FOUND).into());
        }
        self.invalidate().await;
        info!(slug = %service.slug, "Service deleted");
        Ok(())
    }

    /// Publish or unpublish, moving the hero image when the state changes.
    #[instrument(skip_all, fields(service_id = %id, actor = %actor))]
    pub async fn set_published(
        &self,
        id: &str,
        is_published: bool,
        actor: &str,
    ) -> AppResult<Service> {
        let mut service = self.find(id).await?;
        if service.is_published != is_published {
            service.is_published = is_published;
            self.move_image(&mut service).await;
        }
        service.updated_by = Some(actor.to_string());
        service.updated_at = now_utc();
        self.storage
            .replace_service(&service)
            .await
            .map_err(write_error)?;
        self.invalidate().await;
        info!(is_published, "Service publication changed");
        Ok(service)
    }

    /// Apply new display orders. Returns how many services changed.
    pub async fn reorder(&self, orders: &[DisplayOrder]) -> AppResult<u64> {
        let updated = self.storage.set_display_orders(orders).await?;
        self.invalidate().await;
        info!(requested = orders.len(), updated, "Services reordered");
        Ok(updated)
    }

    async fn find(&self, id: &str) -> AppResult<Service> {
        self.storage
            .find_service_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND).into())
    }

    async fn invalidate(&self) {
        self.cache.invalidate_views(&views::SERVICE_WRITES).await;
    }

    fn record_view(&self, id: &str) {
        let storage = Arc::clone(&self.storage);
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = storage.record_service_view(&id, now_utc()).await {
                warn!(service_id = %id, error = %e, "Failed to record service view");
            }
        });
    }

    async fn discard_image(&self, public_id: &str) {
        if public_id.is_empty() {
            return;
        }
        if let Err(e) = self.media.destroy(public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete image");
        }
    }

    /// Rename the hero image into the folder for the current state.
    async fn move_image(&self, service: &mut Service) {
        let from = service.hero_image.public_id.clone();
        let to = format!("{}/{}", service_folder(service.is_published), service.slug);
        if from.is_empty() || from == to {
            return;
        }
        match self.media.rename(&from, &to).await {
            Ok(stored) => {
                service.hero_image.url = stored.secure_url;
                service.hero_image.public_id = stored.public_id;
            }
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "Failed to move image between folders");
            }
        }
    }
}

async fn load_summaries(
    storage: &dyn ServiceStorage,
    show_on_homepage: Option<bool>,
) -> AppResult<Vec<ServiceSummary>> {
    let services = storage.list_published_services(show_on_homepage).await?;
    Ok(services.iter().map(Service::summary).collect())
}

async fn load_published(storage: &dyn ServiceStorage, slug: &str) -> AppResult<Option<Service>> {
    Ok(storage
        .find_service_by_slug(slug)
        .await?
        .filter(|s| s.is_published))
}

async fn load_listing(storage: &dyn ServiceStorage, query: &ServiceQuery) -> AppResult<ServiceListing> {
    let Page { items, total } = storage.query_services(query).await?;
    Ok(ServiceListing {
        services: items,
        pagination: ServicePagination {
            current_page: query.pagination.page,
            total_pages: query.pagination.total_pages(total),
            total_services: total,
            limit: query.pagination.limit,
        },
    })
}

fn write_error(err: StorageError) -> AppError {
    if err.is_not_found() {
        return ApiError::not_found(NOT_FOUND).into();
    }
    match err.duplicate_field() {
        Some("slug") => ApiError::bad_request(SLUG_TAKEN).into(),
        _ => err.into(),
    }
}

fn hero_image(stored: StoredImage) -> HeroImage {
    HeroImage {
        url: stored.secure_url,
        public_id: stored.public_id,
        width: stored.width,
        height: stored.height,
        format: stored.format,
        size: stored.bytes,
    }
}

/// `Ok(None)` when the field was not sent, an error when it was sent blank.
fn provided(raw: Option<&str>, empty_message: &'static str) -> Result<Option<String>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => non_blank(Some(value))
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(empty_message)),
    }
}

fn parse_research_types(raw: &str) -> Result<Vec<String>, ApiError> {
    serde_json::from_str(raw).map_err(|_| ApiError::bad_request("Invalid researchTypes format"))
}

fn parse_seo(raw: &str) -> Result<Seo, ApiError> {
    serde_json::from_str(raw).map_err(|_| ApiError::bad_request("Invalid SEO format"))
}

fn parse_icon(raw: &str) -> Result<IconName, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::validation(
            "Validation failed",
            vec![FieldError::new(
                "iconName",
                format!("{raw} is not a supported icon"),
            )],
        )
    })
}

fn parse_display_order(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(0)
}

/// Read `isPublished` from a publish request body.
pub fn publish_flag(body: &Value) -> Result<bool, ApiError> {
    match body.get("isPublished") {
        None | Some(Value::Null) => Err(ApiError::bad_request("isPublished field is required")),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(raw)) => Ok(form_flag(raw)),
        Some(_) => Ok(false),
    }
}

/// Read and check `orderData` from a reorder request body.
pub fn parse_order_data(body: &Value) -> Result<Vec<DisplayOrder>, ApiError> {
    let data = match body.get("orderData") {
        None | Some(Value::Null) => return Err(ApiError::bad_request("orderData is required")),
        Some(data) => data,
    };
    let items = data
        .as_array()
        .ok_or_else(|| ApiError::bad_request("orderData must be an array"))?;
    if items.is_empty() {
        return Err(ApiError::bad_request("orderData cannot be empty"));
    }
    items
        .iter()
        .map(|item| {
            let service_id = item
                .get("serviceId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty());
            let display_order = item.get("displayOrder").and_then(Value::as_f64);
            match (service_id, display_order) {
                (Some(service_id), Some(order)) => Ok(DisplayOrder {
                    service_id: service_id.to_string(),
                    display_order: order as i32,
                }),
                _ => Err(ApiError::bad_request(ORDER_ITEM_INVALID)),
            }
        })
        .collect()
}
