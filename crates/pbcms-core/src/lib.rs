//! Domain records shared by every pbcms crate.

pub mod admin;
pub mod banner;
pub mod clock;
pub mod error;
pub mod id;
pub mod service;
pub mod text;

pub use admin::{Admin, AdminListItem, AdminProfile, Role};
pub use banner::{ActiveBanner, Banner, DEFAULT_ALT_TEXT};
pub use clock::now_utc;
pub use error::{CoreError, Result};
pub use id::{generate_id, is_valid_id, validate_id};
pub use service::{HeroImage, IconName, Seo, Service, ServiceSummary};
pub use text::{escape_html, slugify, truncate_chars};
