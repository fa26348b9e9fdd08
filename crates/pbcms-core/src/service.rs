//! Services catalog records.

use crate::error::{CoreError, Result};
use crate::text::{SLUG_PATTERN, truncate_chars};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

pub const SHORT_DESCRIPTION_MIN: usize = 50;
pub const SHORT_DESCRIPTION_MAX: usize = 350;
pub const DESCRIPTION_MIN: usize = 50;
pub const META_TITLE_MAX: usize = 70;
pub const META_DESCRIPTION_MAX: usize = 160;

/// Icon shown next to a service card. The set is fixed by the frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconName {
    #[default]
    BarChart3,
    Smartphone,
    TrendingUp,
    Monitor,
    Grid3x3,
    GraduationCap,
}

impl IconName {
    pub const ALL: [IconName; 6] = [
        IconName::BarChart3,
        IconName::Smartphone,
        IconName::TrendingUp,
        IconName::Monitor,
        IconName::Grid3x3,
        IconName::GraduationCap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IconName::BarChart3 => "BarChart3",
            IconName::Smartphone => "Smartphone",
            IconName::TrendingUp => "TrendingUp",
            IconName::Monitor => "Monitor",
            IconName::Grid3x3 => "Grid3x3",
            IconName::GraduationCap => "GraduationCap",
        }
    }
}

impl fmt::Display for IconName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IconName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        IconName::ALL
            .into_iter()
            .find(|icon| icon.as_str() == s.trim())
            .ok_or_else(|| CoreError::invalid_icon(s))
    }
}

fn default_image_format() -> String {
    "webp".to_string()
}

/// Media host reference for a service's hero image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroImage {
    pub url: String,
    pub public_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_image_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Seo {
    #[validate(length(max = 70, message = "Meta title cannot exceed 70 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[validate(length(max = 160, message = "Meta description cannot exceed 160 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[validate(length(max = 15, message = "Cannot have more than 15 meta keywords"))]
    pub meta_keywords: Vec<String>,
}

impl Seo {
    /// Overlay the fields present in `patch`; absent fields keep their value.
    pub fn merge(&mut self, patch: Seo) {
        if patch.meta_title.is_some() {
            self.meta_title = patch.meta_title;
        }
        if patch.meta_description.is_some() {
            self.meta_description = patch.meta_description;
        }
        if !patch.meta_keywords.is_empty() {
            self.meta_keywords = patch.meta_keywords;
        }
    }
}

fn validate_short_description(value: &str) -> std::result::Result<(), ValidationError> {
    let len = value.chars().count();
    if len < SHORT_DESCRIPTION_MIN {
        return Err(ValidationError::new("length")
            .with_message("Short description must be at least 50 characters".into()));
    }
    if len > SHORT_DESCRIPTION_MAX {
        return Err(ValidationError::new("length")
            .with_message("Short description cannot exceed 350 characters".into()));
    }
    Ok(())
}

fn validate_description(value: &str) -> std::result::Result<(), ValidationError> {
    if value.chars().count() < DESCRIPTION_MIN {
        return Err(ValidationError::new("length")
            .with_message("Description must be at least 50 characters".into()));
    }
    Ok(())
}

/// A catalog entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: String,
    #[validate(regex(
        path = *SLUG_PATTERN,
        message = "Slug can only contain lowercase letters, numbers, and hyphens"
    ))]
    pub slug: String,
    #[validate(length(max = 250, message = "Subtitle cannot exceed 250 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[validate(custom(function = "validate_short_description"))]
    pub short_description: String,
    #[validate(custom(function = "validate_description"))]
    pub description: String,
    #[serde(default)]
    pub icon_name: IconName,
    pub hero_image: HeroImage,
    #[validate(length(max = 10, message = "Cannot have more than 10 research types"))]
    #[serde(default)]
    pub research_types: Vec<String>,
    pub is_published: bool,
    pub show_on_homepage: bool,
    pub display_order: i32,
    #[validate(nested)]
    #[serde(default)]
    pub seo: Seo,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_viewed_at: Option<OffsetDateTime>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Service {
    /// Fill empty SEO fields from the title and short description.
    pub fn apply_seo_defaults(&mut self) {
        if self.seo.meta_title.as_deref().is_none_or(str::is_empty) {
            self.seo.meta_title = Some(truncate_chars(&self.title, META_TITLE_MAX));
        }
        if self.seo.meta_description.as_deref().is_none_or(str::is_empty) {
            self.seo.meta_description =
                Some(truncate_chars(&self.short_description, META_DESCRIPTION_MAX));
        }
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            slug: self.slug.clone(),
            subtitle: self.subtitle.clone(),
            short_description: self.short_description.clone(),
            icon_name: self.icon_name,
            hero_image: self.hero_image.clone(),
            display_order: self.display_order,
            is_published: self.is_published,
            show_on_homepage: self.show_on_homepage,
        }
    }
}

/// Card projection used by the public listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub short_description: String,
    pub icon_name: IconName,
    pub hero_image: HeroImage,
    pub display_order: i32,
    pub is_published: bool,
    pub show_on_homepage: bool,
}
