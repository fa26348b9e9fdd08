//! Refresh token cookie.

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::CookieConfig;

/// Builds the HttpOnly, SameSite=Strict cookie carrying `token`.
pub fn refresh_cookie(
    config: &CookieConfig,
    token: &str,
    lifetime: std::time::Duration,
) -> Cookie<'static> {
    let max_age = Duration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX));
    Cookie::build((config.name.clone(), token.to_string()))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Strict)
        .path(config.path.clone())
        .max_age(max_age)
        .build()
}

/// Same attributes as [`refresh_cookie`], empty value and `Max-Age=0`.
pub fn cleared_cookie(config: &CookieConfig) -> Cookie<'static> {
    Cookie::build((config.name.clone(), String::new()))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Strict)
        .path(config.path.clone())
        .max_age(Duration::ZERO)
        .build()
}

/// Reads the refresh token from the request cookies.
pub fn read_refresh_token<'a>(jar: &'a CookieJar, config: &CookieConfig) -> Option<&'a str> {
    jar.get(&config.name)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_cookie_attributes() {
        let config = CookieConfig {
            secure: true,
            ..Default::default()
        };
        let cookie = refresh_cookie(&config, "tok", std::time::Duration::from_secs(604_800));
        let header = cookie.to_string();
        assert!(header.starts_with("refreshToken=tok"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=604800"));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let header = cleared_cookie(&CookieConfig::default()).to_string();
        assert!(header.starts_with("refreshToken=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_read_refresh_token() {
        let config = CookieConfig::default();
        let jar = CookieJar::new().add(Cookie::new("refreshToken", "abc"));
        assert_eq!(read_refresh_token(&jar, &config), Some("abc"));
        assert_eq!(read_refresh_token(&CookieJar::new(), &config), None);
    }
}
