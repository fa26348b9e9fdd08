//! Image hosting.
//!
//! Uploaded images are pushed to the media host and only their URL and
//! public id are stored with the record. [`CloudinaryStore`] talks to the
//! Cloudinary REST API; [`MemoryMediaStore`] keeps bytes in process for
//! tests and local development.

pub mod cloudinary;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use pbcms_api::ApiError;

pub use cloudinary::CloudinaryStore;
pub use memory::MemoryMediaStore;

use crate::config::MediaConfig;

pub const SERVICES_ACTIVE_FOLDER: &str = "pbgroup/services/active";
pub const SERVICES_INACTIVE_FOLDER: &str = "pbgroup/services/inactive";
pub const BANNERS_FOLDER: &str = "pbgroup/banners";

/// Folder a service's hero image lives in for a publication state.
pub fn service_folder(is_published: bool) -> &'static str {
    if is_published {
        SERVICES_ACTIVE_FOLDER
    } else {
        SERVICES_INACTIVE_FOLDER
    }
}

/// Result of a successful upload or rename.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StoredImage {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub bytes: Option<u64>,
}

fn default_format() -> String {
    "webp".to_string()
}

/// An image received from a multipart form.
#[derive(Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl ImageUpload {
    /// Check size and type before anything is sent to the host.
    pub fn validate(&self, max_bytes: usize) -> Result<(), MediaError> {
        if !self.content_type.starts_with("image/") {
            return Err(MediaError::NotAnImage);
        }
        if self.bytes.len() > max_bytes {
            return Err(MediaError::TooLarge { max_bytes });
        }
        if self.bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Only image files are allowed")]
    NotAnImage,
    #[error("File too large. Maximum size is {} MB", max_bytes / (1024 * 1024))]
    TooLarge { max_bytes: usize },
    #[error("Uploaded file is empty")]
    Empty,
    #[error("invalid media configuration: {0}")]
    Config(String),
    #[error("media request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media host rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("image not found: {0}")]
    NotFound(String),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotAnImage | MediaError::Empty => ApiError::bad_request(err.to_string()),
            MediaError::TooLarge { .. } => ApiError::payload_too_large(err.to_string()),
            MediaError::Config(_) => {
                tracing::error!(error = %err, "media host misconfigured");
                ApiError::internal(err.to_string())
            }
            MediaError::Http(_) | MediaError::Rejected { .. } | MediaError::NotFound(_) => {
                tracing::error!(error = %err, "media host request failed");
                ApiError::upstream(err.to_string())
            }
        }
    }
}

/// Operations on the image host.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload under `{folder}/{public_id}`, converted to webp, limited to
    /// 1920x1280 and compressed with automatic quality.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        public_id: &str,
    ) -> Result<StoredImage, MediaError>;

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;

    /// Move an image to a new public id. The URL changes with it.
    async fn rename(&self, from: &str, to: &str) -> Result<StoredImage, MediaError>;
}

/// Build the media store from configuration: Cloudinary when a URL is
/// configured, otherwise in process.
pub fn create_media_store(config: &MediaConfig) -> Result<Arc<dyn MediaStore>, MediaError> {
    match config.cloudinary_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            let store = CloudinaryStore::from_url(url, config.request_timeout())?;
            tracing::info!(cloud = %store.cloud_name(), "Using Cloudinary media host");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("CLOUDINARY_URL not set, keeping uploaded images in memory");
            Ok(Arc::new(MemoryMediaStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            bytes: vec![0; len],
            content_type: content_type.into(),
            file_name: Some("hero.png".into()),
        }
    }

    #[test]
    fn test_upload_validation() {
        assert!(upload("image/png", 10).validate(100).is_ok());
        assert!(matches!(
            upload("application/pdf", 10).validate(100),
            Err(MediaError::NotAnImage)
        ));
        assert!(matches!(
            upload("image/png", 101).validate(100),
            Err(MediaError::TooLarge { .. })
        ));
        assert!(matches!(upload("image/png", 0).validate(100), Err(MediaError::Empty)));
    }

    #[test]
    fn test_error_statuses() {
        use axum::http::StatusCode;
        let status = |e: MediaError| ApiError::from(e).status_code();
        assert_eq!(status(MediaError::NotAnImage), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(MediaError::TooLarge { max_bytes: 5 * 1024 * 1024 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status(MediaError::Rejected {
                status: 500,
                message: "boom".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            MediaError::TooLarge { max_bytes: 5 * 1024 * 1024 }.to_string(),
            "File too large. Maximum size is 5 MB"
        );
    }

    #[test]
    fn test_folders() {
        assert_eq!(service_folder(true), "pbgroup/services/active");
        assert_eq!(service_folder(false), "pbgroup/services/inactive");
    }

    #[test]
    fn test_memory_store_without_url() {
        assert!(create_media_store(&MediaConfig::default()).is_ok());
    }
}
