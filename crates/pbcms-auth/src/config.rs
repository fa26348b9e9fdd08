//! Authentication configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum length of a signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Token, lockout and cookie settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret for access tokens.
    pub access_secret: String,

    /// HS256 secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,

    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Failed logins before the account is locked.
    pub max_failed_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub lockout_duration: Duration,

    pub cookie: CookieConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_lifetime: Duration::from_secs(15 * 60),
            refresh_token_lifetime: Duration::from_secs(7 * 24 * 60 * 60),
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            cookie: CookieConfig::default(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lockout_duration", &self.lockout_duration)
            .field("cookie", &self.cookie)
            .finish()
    }
}

impl AuthConfig {
    /// Creates a config with the given secrets and default lifetimes.
    #[must_use]
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_lockout(mut self, max_failed_attempts: u32, duration: Duration) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self.lockout_duration = duration;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    /// Validates secrets and limits.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_secret.is_empty() {
            return Err("auth.access_secret (JWT_ACCESS_SECRET) is required".into());
        }
        if self.refresh_secret.is_empty() {
            return Err("auth.refresh_secret (JWT_REFRESH_SECRET) is required".into());
        }
        if self.access_secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "auth.access_secret must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        if self.refresh_secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "auth.refresh_secret must be at least {MIN_SECRET_LEN} bytes"
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err("auth.access_secret and auth.refresh_secret must differ".into());
        }
        if self.access_token_lifetime.is_zero() || self.refresh_token_lifetime.is_zero() {
            return Err("token lifetimes must be greater than zero".into());
        }
        if self.max_failed_attempts == 0 {
            return Err("auth.max_failed_attempts must be at least 1".into());
        }
        Ok(())
    }
}

/// Refresh cookie attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    pub name: String,
    /// Send only over HTTPS. On in production.
    pub secure: bool,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "refreshToken".into(),
            secure: false,
            path: "/".into(),
        }
    }
}
