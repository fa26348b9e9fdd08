//! Promotional banners.

use std::sync::Arc;

use pbcms_api::ApiError;
use pbcms_core::{ActiveBanner, Banner, DEFAULT_ALT_TEXT, generate_id, now_utc};
use pbcms_storage::{BannerQuery, BannerStorage, Page};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{form_flag, non_blank};
use crate::cache::{CacheBackend, keys, views};
use crate::error::{AppError, AppResult};
use crate::media::{BANNERS_FOLDER, ImageUpload, MediaStore};

const NOT_FOUND: &str = "Banner not found";

/// Multipart fields of the banner forms.
#[derive(Debug, Default, Clone)]
pub struct BannerForm {
    pub link: Option<String>,
    pub alt_text: Option<String>,
    pub is_active: Option<String>,
    pub image: Option<ImageUpload>,
}

impl BannerForm {
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "link" => &mut self.link,
            "altText" => &mut self.alt_text,
            "isActive" => &mut self.is_active,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerPagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_banners: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerListing {
    pub banners: Vec<Banner>,
    pub pagination: BannerPagination,
}

#[derive(Clone)]
pub struct Banners {
    storage: Arc<dyn BannerStorage>,
    cache: CacheBackend,
    media: Arc<dyn MediaStore>,
    max_upload_bytes: usize,
}

impl Banners {
    pub fn new(
        storage: Arc<dyn BannerStorage>,
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

    /// The newest active banner, or `None` when nothing is running.
    pub async fn active(&self) -> AppResult<Option<ActiveBanner>> {
        let key = keys::active_banner().to_string();
        self.cache
            .get_cached_data(&key, views::ACTIVE_BANNER.ttl, || {
                load_active(self.storage.as_ref())
            })
            .await
    }

    pub async fn list(&self, query: &BannerQuery) -> AppResult<BannerListing> {
        let key = keys::admin_banners(query).to_string();
        self.cache
            .get_cached_data(&key, views::ADMIN_BANNERS.ttl, || {
                load_listing(self.storage.as_ref(), query)
            })
            .await
    }

    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn create(&self, form: BannerForm, actor: &str) -> AppResult<Banner> {
        let image = form
            .image
            .ok_or_else(|| ApiError::bad_request("Image file is required"))?;
        image.validate(self.max_upload_bytes)?;

        let id = generate_id();
        let stored = self.media.upload(image.bytes, BANNERS_FOLDER, &id).await?;
        let now = now_utc();
        let banner = Banner {
            id,
            image_url: stored.secure_url,
            image_public_id: Some(stored.public_id),
            link: non_blank(form.link.as_deref()),
            alt_text: non_blank(form.alt_text.as_deref())
                .unwrap_or_else(|| DEFAULT_ALT_TEXT.to_string()),
            is_active: form.is_active.as_deref().is_none_or(form_flag),
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.storage.insert_banner(&banner).await {
            self.discard_image(banner.image_public_id.as_deref()).await;
            return Err(e.into());
        }
        self.invalidate().await;
        info!(banner_id = %banner.id, is_active = banner.is_active, "Banner created");
        Ok(banner)
    }

    #[instrument(skip_all, fields(banner_id = %id))]
    pub async fn update(&self, id: &str, form: BannerForm) -> AppResult<Banner> {
        if let Some(image) = &form.image {
            image.validate(self.max_upload_bytes)?;
        }
        let mut banner = self.find(id).await?;

        if let Some(link) = form.link.as_deref() {
            banner.link = non_blank(Some(link));
        }
        if let Some(alt_text) = form.alt_text.as_deref() {
            banner.alt_text =
                non_blank(Some(alt_text)).unwrap_or_else(|| DEFAULT_ALT_TEXT.to_string());
        }
        if let Some(raw) = form.is_active.as_deref() {
            banner.is_active = form_flag(raw);
        }
        if let Some(image) = form.image {
            self.discard_image(banner.image_public_id.as_deref()).await;
            let stored = self
                .media
                .upload(image.bytes, BANNERS_FOLDER, &banner.id)
                .await?;
            banner.image_url = stored.secure_url;
            banner.image_public_id = Some(stored.public_id);
        }
        banner.updated_at = now_utc();

        self.storage.replace_banner(&banner).await.map_err(|e| {
            if e.is_not_found() {
                AppError::from(ApiError::not_found(NOT_FOUND))
            } else {
                AppError::from(e)
            }
        })?;
        self.invalidate().await;
        info!(is_active = banner.is_active, "Banner updated");
        Ok(banner)
    }

    #[instrument(skip_all, fields(banner_id = %id))]
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let banner = self.find(id).await?;
        self.discard_image(banner.image_public_id.as_deref()).await;
        if !self.storage.delete_banner(id).await? {
            return Err(ApiError::not_found(NOT_FOUND).into());
        }
        self.invalidate().await;
        info!("Banner deleted");
        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Banner> {
        self.storage
            .find_banner_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND).into())
    }

    async fn invalidate(&self) {
        self.cache.invalidate_views(&views::BANNER_WRITES).await;
    }

    async fn discard_image(&self, public_id: Option<&str>) {
        let Some(public_id) = public_id.filter(|id| !id.is_empty()) else {
            return;
        };
        if let Err(e) = self.media.destroy(public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete banner image");
        }
    }
}

async fn load_active(storage: &dyn BannerStorage) -> AppResult<Option<ActiveBanner>> {
    Ok(storage
        .latest_active_banner()
        .await?
        .map(|banner| banner.public_view()))
}

async fn load_listing(storage: &dyn BannerStorage, query: &BannerQuery) -> AppResult<BannerListing> {
    let Page { items, total } = storage.query_banners(query).await?;
    Ok(BannerListing {
        banners: items,
        pagination: BannerPagination {
            current_page: query.pagination.page,
            total_pages: query.pagination.total_pages(total),
            total_banners: total,
            limit: query.pagination.limit,
        },
    })
}
