//! Content operations behind the HTTP handlers.
//!
//! Each service owns its store handle, the shared cache and, where images
//! are involved, the media host. Reads go through the cache; writes
//! invalidate every view family they can affect before returning.

pub mod banners;
pub mod dashboard;
pub mod services;

pub use banners::{BannerForm, BannerListing, Banners};
pub use dashboard::{AdminDashboard, Dashboard, SuperAdminDashboard};
pub use services::{ServiceCatalog, ServiceForm, ServiceListing};

/// Form booleans arrive as strings. Only `"true"` is true.
pub(crate) fn form_flag(raw: &str) -> bool {
    raw.trim() == "true"
}

/// Trimmed value, `None` when blank.
pub(crate) fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
