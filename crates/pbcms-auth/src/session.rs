//! Admin sessions: registration, login, refresh rotation and logout.
//!
//! The refresh token is stored on the account. Refresh only succeeds when
//! the presented token equals the stored one, and the swap to a new token
//! is a compare-and-set, so a replayed token loses.

use std::sync::Arc;

use pbcms_core::{Admin, Role, escape_html, generate_id, now_utc};
use pbcms_storage::AdminStorage;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::password::{hash_password, verify_password};
use crate::token::{JwtService, TokenKind};

/// Login form. Both fields are optional so that a missing field is a
/// 400 rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Registration form.
#[derive(Clone, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters"))]
    #[serde(default)]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    #[serde(default)]
    pub email: String,

    #[validate(length(
        min = 3,
        max = 30,
        message = "Username must be between 3 and 30 characters"
    ))]
    #[serde(default)]
    pub username: String,

    #[validate(custom(function = "validate_password_strength"))]
    #[serde(default)]
    pub password: String,

    #[validate(custom(function = "validate_role"))]
    #[serde(default)]
    pub role: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegisterRequest {
    /// Trim everything, lowercase email, username and role.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_lowercase(),
            password: self.password,
            role: self
                .role
                .map(|r| r.trim().to_lowercase())
                .filter(|r| !r.is_empty()),
        }
    }

    fn requested_role(&self) -> Role {
        self.role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::Admin)
    }
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(validation_error(
            "length",
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(validation_error(
            "uppercase",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(validation_error(
            "lowercase",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(validation_error(
            "digit",
            "Password must contain at least one number",
        ));
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(validation_error(
            "special",
            "Password must contain at least one special character",
        ));
    }
    Ok(())
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>()
        .map(|_| ())
        .map_err(|_| validation_error("role", "Role must be either 'admin' or 'super_admin'"))
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub admin: Admin,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
}

const SUPER_ADMIN_TAKEN: &str = "A super_admin already exists. Only one super_admin is allowed.";

/// Session operations over an admin store.
#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn AdminStorage>,
    jwt: Arc<JwtService>,
    config: AuthConfig,
}

impl SessionService {
    pub fn new(storage: Arc<dyn AdminStorage>, jwt: Arc<JwtService>, config: AuthConfig) -> Self {
        Self {
            storage,
            jwt,
            config,
        }
    }

    #[must_use]
    pub fn jwt(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Whether registration is currently open to anonymous callers.
    pub async fn is_bootstrap(&self) -> AuthResult<bool> {
        Ok(self.storage.count_admins().await? == 0)
    }

    /// Creates an admin account.
    ///
    /// With no accounts in the store anyone may register and becomes the
    /// super admin. Afterwards `actor` must be a super admin.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        request: RegisterRequest,
        actor: Option<&Admin>,
    ) -> AuthResult<Admin> {
        if !self.is_bootstrap().await? {
            match actor {
                None => return Err(AuthError::AccessTokenRequired),
                Some(a) if !a.role.is_super_admin() => {
                    return Err(AuthError::super_admin_required());
                }
                Some(_) => {}
            }
        }

        let request = request.normalized();
        request.validate()?;

        let super_admin_exists = self.storage.count_admins_by_role(Role::SuperAdmin).await? > 0;
        if super_admin_exists && actor.is_none() {
            return Err(AuthError::AccessTokenRequired);
        }
        if super_admin_exists && request.requested_role() == Role::SuperAdmin {
            return Err(AuthError::forbidden(SUPER_ADMIN_TAKEN));
        }

        if self.storage.find_admin_by_email(&request.email).await?.is_some() {
            return Err(AuthError::conflict("Email already registered"));
        }
        let username = escape_html(&request.username);
        if self.storage.find_admin_by_username(&username).await?.is_some() {
            return Err(AuthError::conflict("Username already taken"));
        }

        let now = now_utc();
        let admin = Admin {
            id: generate_id(),
            name: escape_html(&request.name),
            email: request.email,
            username,
            password_hash: hash_password(&request.password)?,
            role: if super_admin_exists {
                Role::Admin
            } else {
                Role::SuperAdmin
            },
            refresh_token: None,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            created_by: actor.map(|a| a.id.clone()),
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };

        // The store admits a single super admin. Losing that race means
        // another registration bootstrapped first.
        self.storage.insert_admin(&admin).await.map_err(|e| {
            match e.duplicate_field() {
                Some("email") => AuthError::conflict("Email already registered"),
                Some("username") => AuthError::conflict("Username already taken"),
                Some("role") if actor.is_none() => AuthError::AccessTokenRequired,
                Some("role") => AuthError::forbidden(SUPER_ADMIN_TAKEN),
                _ => AuthError::Storage(e),
            }
        })?;

        info!(admin_id = %admin.id, role = %admin.role, "Admin registered");
        Ok(admin)
    }

    /// Verifies credentials, applies lockout bookkeeping and issues tokens.
    #[instrument(skip_all)]
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_lowercase);
        let password = request.password.filter(|p| !p.is_empty());
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::MissingCredentials);
        };

        let Some(admin) = self.storage.find_admin_by_username(&username).await? else {
            warn!(username = %username, "Login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !admin.is_active {
            warn!(admin_id = %admin.id, "Login failed: account deactivated");
            return Err(AuthError::InvalidCredentials);
        }

        let now = now_utc();
        if admin.is_locked(now) {
            warn!(admin_id = %admin.id, "Login failed: account locked");
            return Err(AuthError::InvalidCredentials);
        }

        if !verify_password(&password, &admin.password_hash)? {
            self.record_failed_attempt(&admin, now).await?;
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.jwt.issue(TokenKind::Access, &admin)?;
        let refresh_token = self.jwt.issue(TokenKind::Refresh, &admin)?;
        self.storage
            .record_login(&admin.id, &refresh_token, now)
            .await?;

        info!(admin_id = %admin.id, username = %admin.username, "Login successful");
        let admin = Admin {
            refresh_token: Some(refresh_token.clone()),
            login_attempts: 0,
            lock_until: None,
            last_login: Some(now),
            updated_at: now,
            ..admin
        };
        Ok(LoginOutcome {
            admin,
            access_token,
            refresh_token,
        })
    }

    async fn record_failed_attempt(&self, admin: &Admin, now: OffsetDateTime) -> AuthResult<()> {
        // An expired lock starts a fresh count.
        let previous = match admin.lock_until {
            Some(until) if until <= now => 0,
            _ => admin.login_attempts,
        };
        let attempts = previous.saturating_add(1);
        let lock_until = (attempts >= self.config.max_failed_attempts)
            .then(|| now + self.config.lockout_duration);
        self.storage
            .update_login_attempts(&admin.id, attempts, lock_until)
            .await?;
        if lock_until.is_some() {
            warn!(admin_id = %admin.id, attempts, "Account locked after failed logins");
        } else {
            warn!(admin_id = %admin.id, attempts, "Login failed: wrong password");
        }
        Ok(())
    }

    /// Exchanges a refresh token for a new access token and a rotated
    /// refresh token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: Option<&str>) -> AuthResult<RefreshOutcome> {
        let presented = presented
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::RefreshTokenMissing)?;

        let claims = self
            .jwt
            .verify(TokenKind::Refresh, presented)
            .map_err(|e| {
                warn!(error = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;

        let admin = self
            .storage
            .find_admin_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if admin.refresh_token.as_deref() != Some(presented) {
            warn!(admin_id = %admin.id, "Refresh token does not match stored token");
            return Err(AuthError::RefreshTokenMismatch);
        }
        if !admin.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let refresh_token = self.jwt.issue(TokenKind::Refresh, &admin)?;
        if !self
            .storage
            .rotate_refresh_token(&admin.id, presented, &refresh_token)
            .await?
        {
            warn!(admin_id = %admin.id, "Refresh token rotated concurrently");
            return Err(AuthError::RefreshTokenMismatch);
        }
        let access_token = self.jwt.issue(TokenKind::Access, &admin)?;

        info!(admin_id = %admin.id, "Refresh token rotated");
        Ok(RefreshOutcome {
            access_token,
            refresh_token,
        })
    }

    /// Revokes the stored refresh token.
    pub async fn logout(&self, admin_id: &str) -> AuthResult<()> {
        self.storage.clear_refresh_token(admin_id).await?;
        info!(admin_id = %admin_id, "Logout");
        Ok(())
    }

    /// Resolves a verified access token to an active account.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<Admin> {
        let claims = self
            .jwt
            .verify(TokenKind::Access, access_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::InvalidAccessToken
            })?;
        let admin = self
            .storage
            .find_admin_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !admin.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        Ok(admin)
    }
}
