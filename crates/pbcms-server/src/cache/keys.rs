//! Structured cache keys.
//!
//! A key renders as `{namespace}:{entity}[:{ident}][:{filter}={value}]*`.
//! Every key of one family shares the pattern `{namespace}:{entity}*`, so
//! write paths invalidate through the same definitions the read paths use.

use std::fmt;
use std::time::Duration;

use pbcms_storage::{BannerQuery, ServiceQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    namespace: &'static str,
    entity: &'static str,
    ident: Option<String>,
    filters: Vec<(&'static str, String)>,
}

impl CacheKey {
    pub fn new(namespace: &'static str, entity: &'static str) -> Self {
        Self {
            namespace,
            entity,
            ident: None,
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    /// Append a filter. Order of calls is the order in the rendered key.
    #[must_use]
    pub fn filter(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.filters.push((name, value.to_string()));
        self
    }

    /// Glob matching every key of this family.
    pub fn family_pattern(&self) -> String {
        format!("{}:{}*", self.namespace, self.entity)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.entity)?;
        if let Some(ident) = &self.ident {
            write!(f, ":{ident}")?;
        }
        for (name, value) in &self.filters {
            write!(f, ":{name}={value}")?;
        }
        Ok(())
    }
}

/// One cached read path: its key family and how long entries live.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub namespace: &'static str,
    pub entity: &'static str,
    pub ttl: Duration,
}

impl View {
    pub const fn new(namespace: &'static str, entity: &'static str, ttl_secs: u64) -> Self {
        Self {
            namespace,
            entity,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.namespace, self.entity)
    }

    pub fn pattern(&self) -> String {
        self.key().family_pattern()
    }
}

pub mod views {
    use super::View;

    pub const ACTIVE_SERVICES: View = View::new("services", "active", 30 * 60);
    pub const SERVICE_BY_SLUG: View = View::new("service", "slug", 15 * 60);
    pub const ADMIN_SERVICES: View = View::new("dashboard:shared", "services", 2 * 60);
    pub const ACTIVE_BANNER: View = View::new("banner", "active", 50 * 60);
    pub const ADMIN_BANNERS: View = View::new("dashboard:shared", "banners", 5 * 60);
    pub const ADMINS: View = View::new("dashboard:super", "admins", 5 * 60);
    pub const TOTAL_ADMINS: View = View::new("dashboard:shared", "totalAdmins", 5 * 60);

    /// Views holding any projection of a service.
    pub const SERVICE_WRITES: [View; 3] = [ADMIN_SERVICES, ACTIVE_SERVICES, SERVICE_BY_SLUG];
    /// Views holding any projection of a banner.
    pub const BANNER_WRITES: [View; 2] = [ADMIN_BANNERS, ACTIVE_BANNER];
    /// Views derived from the admin accounts.
    pub const ADMIN_WRITES: [View; 2] = [ADMINS, TOTAL_ADMINS];
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| "all".to_string(), |v| v.to_string())
}

pub fn active_services(show_on_homepage: Option<bool>) -> CacheKey {
    views::ACTIVE_SERVICES
        .key()
        .filter("homepage", flag(show_on_homepage))
}

pub fn service_by_slug(slug: &str) -> CacheKey {
    views::SERVICE_BY_SLUG.key().ident(slug)
}

pub fn admin_services(query: &ServiceQuery) -> CacheKey {
    views::ADMIN_SERVICES
        .key()
        .filter("page", query.pagination.page)
        .filter("limit", query.pagination.limit)
        .filter("status", query.status.as_str())
        .filter("search", query.search.as_deref().unwrap_or(""))
        .filter("homepage", flag(query.show_on_homepage))
}

pub fn active_banner() -> CacheKey {
    views::ACTIVE_BANNER.key().ident("public")
}

pub fn admin_banners(query: &BannerQuery) -> CacheKey {
    views::ADMIN_BANNERS
        .key()
        .filter("page", query.pagination.page)
        .filter("limit", query.pagination.limit)
        .filter("status", query.status.as_str())
}

pub fn admins() -> CacheKey {
    views::ADMINS.key()
}

pub fn total_admins() -> CacheKey {
    views::TOTAL_ADMINS.key()
}
