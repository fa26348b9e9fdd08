//! Promotional banners ("call to action" posters).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const DEFAULT_ALT_TEXT: &str = "Poster";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "_id")]
    pub id: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub alt_text: String,
    pub is_active: bool,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Banner {
    pub fn public_view(&self) -> ActiveBanner {
        ActiveBanner {
            image_url: self.image_url.clone(),
            link: self.link.clone(),
            alt_text: self.alt_text.clone(),
        }
    }
}

/// What the public site needs to render the current banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBanner {
    pub image_url: String,
    pub link: Option<String>,
    pub alt_text: String,
}
