//! BSON document shapes and their mapping to domain records.
//!
//! Field names match the collections the site has always used (camelCase,
//! `password` for the hash), so existing data loads unchanged.

use crate::error::{MongoError, Result};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use pbcms_core::clock::{from_unix_millis, unix_millis};
use pbcms_core::{Admin, Banner, HeroImage, IconName, Role, Seo, Service};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| MongoError::mapping(format!("invalid id {id}: {e}")))
}

pub fn to_bson_datetime(at: OffsetDateTime) -> DateTime {
    DateTime::from_millis(unix_millis(at))
}

pub fn from_bson_datetime(at: DateTime) -> Result<OffsetDateTime> {
    from_unix_millis(at.timestamp_millis()).map_err(|e| MongoError::mapping(e.to_string()))
}

fn from_optional(at: Option<DateTime>) -> Result<Option<OffsetDateTime>> {
    at.map(from_bson_datetime).transpose()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub login_attempts: i32,
    #[serde(default)]
    pub lock_until: Option<DateTime>,
    #[serde(default)]
    pub last_login: Option<DateTime>,
    #[serde(default)]
    pub created_by: Option<ObjectId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_true() -> bool {
    true
}

impl AdminDocument {
    pub fn from_admin(admin: &Admin) -> Result<Self> {
        Ok(Self {
            id: parse_object_id(&admin.id)?,
            name: admin.name.clone(),
            email: admin.email.clone(),
            username: admin.username.clone(),
            password: admin.password_hash.clone(),
            role: admin.role,
            refresh_token: admin.refresh_token.clone(),
            login_attempts: i32::try_from(admin.login_attempts).unwrap_or(i32::MAX),
            lock_until: admin.lock_until.map(to_bson_datetime),
            last_login: admin.last_login.map(to_bson_datetime),
            created_by: admin
                .created_by
                .as_deref()
                .map(parse_object_id)
                .transpose()?,
            is_active: admin.is_active,
            email_verified: admin.email_verified,
            created_at: to_bson_datetime(admin.created_at),
            updated_at: to_bson_datetime(admin.updated_at),
        })
    }

    pub fn into_admin(self) -> Result<Admin> {
        Ok(Admin {
            id: self.id.to_hex(),
            name: self.name,
            email: self.email,
            username: self.username,
            password_hash: self.password,
            role: self.role,
            refresh_token: self.refresh_token,
            login_attempts: u32::try_from(self.login_attempts).unwrap_or(0),
            lock_until: from_optional(self.lock_until)?,
            last_login: from_optional(self.last_login)?,
            created_by: self.created_by.map(|id| id.to_hex()),
            is_active: self.is_active,
            email_verified: self.email_verified,
            created_at: from_bson_datetime(self.created_at)?,
            updated_at: from_bson_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub short_description: String,
    pub description: String,
    #[serde(default)]
    pub icon_name: IconName,
    pub hero_image: HeroImageDocument,
    #[serde(default)]
    pub research_types: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default = "default_true")]
    pub show_on_homepage: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub seo: Seo,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime>,
    pub created_by: String,
    #[serde(default)]
    pub updated_by: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// BSON has no unsigned integers; dimensions and sizes are stored as i64.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroImageDocument {
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub size: Option<i64>,
}

fn default_format() -> String {
    "webp".to_string()
}

impl From<&HeroImage> for HeroImageDocument {
    fn from(image: &HeroImage) -> Self {
        Self {
            url: image.url.clone(),
            public_id: image.public_id.clone(),
            width: image.width.map(i64::from),
            height: image.height.map(i64::from),
            format: image.format.clone(),
            size: image.size.and_then(|s| i64::try_from(s).ok()),
        }
    }
}

impl From<HeroImageDocument> for HeroImage {
    fn from(doc: HeroImageDocument) -> Self {
        Self {
            url: doc.url,
            public_id: doc.public_id,
            width: doc.width.and_then(|w| u32::try_from(w).ok()),
            height: doc.height.and_then(|h| u32::try_from(h).ok()),
            format: doc.format,
            size: doc.size.and_then(|s| u64::try_from(s).ok()),
        }
    }
}

impl ServiceDocument {
    pub fn from_service(service: &Service) -> Result<Self> {
        Ok(Self {
            id: parse_object_id(&service.id)?,
            title: service.title.clone(),
            slug: service.slug.clone(),
            subtitle: service.subtitle.clone(),
            short_description: service.short_description.clone(),
            description: service.description.clone(),
            icon_name: service.icon_name,
            hero_image: HeroImageDocument::from(&service.hero_image),
            research_types: service.research_types.clone(),
            is_published: service.is_published,
            show_on_homepage: service.show_on_homepage,
            display_order: service.display_order,
            seo: service.seo.clone(),
            view_count: i64::try_from(service.view_count).unwrap_or(i64::MAX),
            last_viewed_at: service.last_viewed_at.map(to_bson_datetime),
            created_by: service.created_by.clone(),
            updated_by: service.updated_by.clone(),
            created_at: to_bson_datetime(service.created_at),
            updated_at: to_bson_datetime(service.updated_at),
        })
    }

    pub fn into_service(self) -> Result<Service> {
        Ok(Service {
            id: self.id.to_hex(),
            title: self.title,
            slug: self.slug,
            subtitle: self.subtitle,
            short_description: self.short_description,
            description: self.description,
            icon_name: self.icon_name,
            hero_image: self.hero_image.into(),
            research_types: self.research_types,
            is_published: self.is_published,
            show_on_homepage: self.show_on_homepage,
            display_order: self.display_order,
            seo: self.seo,
            view_count: u64::try_from(self.view_count).unwrap_or(0),
            last_viewed_at: from_optional(self.last_viewed_at)?,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: from_bson_datetime(self.created_at)?,
            updated_at: from_bson_datetime(self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub image_url: String,
    #[serde(default)]
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_alt_text")]
    pub alt_text: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_alt_text() -> String {
    pbcms_core::DEFAULT_ALT_TEXT.to_string()
}

impl BannerDocument {
    pub fn from_banner(banner: &Banner) -> Result<Self> {
        Ok(Self {
            id: parse_object_id(&banner.id)?,
            image_url: banner.image_url.clone(),
            image_public_id: banner.image_public_id.clone(),
            link: banner.link.clone(),
            alt_text: banner.alt_text.clone(),
            is_active: banner.is_active,
            created_by: banner.created_by.clone(),
            created_at: to_bson_datetime(banner.created_at),
            updated_at: to_bson_datetime(banner.updated_at),
        })
    }

    pub fn into_banner(self) -> Result<Banner> {
        Ok(Banner {
            id: self.id.to_hex(),
            image_url: self.image_url,
            image_public_id: self.image_public_id,
            link: self.link,
            alt_text: self.alt_text,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: from_bson_datetime(self.created_at)?,
            updated_at: from_bson_datetime(self.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbcms_core::generate_id;
    use time::macros::datetime;

    #[test]
    fn admin_roundtrip_keeps_fields() {
        let at = datetime!(2024-02-03 04:05:06.789 UTC);
        let admin = Admin {
            id: generate_id(),
            name: "Root".into(),
            email: "root@example.com".into(),
            username: "root".into(),
            password_hash: "$argon2id$v=19$hash".into(),
            role: Role::SuperAdmin,
            refresh_token: Some("jwt".into()),
            login_attempts: 3,
            lock_until: Some(at),
            last_login: None,
            created_by: Some(generate_id()),
            is_active: true,
            email_verified: false,
            created_at: at,
            updated_at: at,
        };
        let doc = AdminDocument::from_admin(&admin).unwrap();
        assert_eq!(doc.password, admin.password_hash);
        assert_eq!(doc.into_admin().unwrap(), admin);
    }

    #[test]
    fn rejects_ids_that_are_not_object_ids() {
        assert!(parse_object_id("not-hex").is_err());
        assert!(parse_object_id(&generate_id()).is_ok());
    }

    #[test]
    fn hero_image_dimensions_survive_signed_storage() {
        let image = HeroImage {
            url: "https://cdn/x.webp".into(),
            public_id: "pbgroup/services/active/x".into(),
            width: Some(1920),
            height: Some(1280),
            format: "webp".into(),
            size: Some(48_213),
        };
        let back: HeroImage = HeroImageDocument::from(&image).into();
        assert_eq!(back, image);
    }
}
