//! Bearer token authentication extractors.
//!
//! # Example
//!
//! ```ignore
//! use pbcms_auth::middleware::{AdminAuth, SuperAdminAuth};
//!
//! async fn dashboard(AdminAuth(admin): AdminAuth) -> String {
//!     format!("Hello, {}!", admin.username)
//! }
//!
//! async fn admins(SuperAdminAuth(admin): SuperAdminAuth) -> String {
//!     admin.username
//! }
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use pbcms_core::{Admin, Role};

use crate::error::AuthError;
use crate::session::SessionService;

// =============================================================================
// Auth State
// =============================================================================

/// State required by the extractors, made available through `FromRef`.
///
/// ```ignore
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionService>,
}

impl AuthState {
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self { sessions }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// Any active admin holding a valid access token.
pub struct BearerAuth(pub Admin);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::AccessTokenRequired)?;
        let admin = auth_state.sessions.authenticate(token).await?;
        tracing::debug!(admin_id = %admin.id, role = %admin.role, "Token validated");
        Ok(BearerAuth(admin))
    }
}

/// Like [`BearerAuth`] but absent when no `Authorization` header is sent.
/// A header that is present but invalid still rejects.
impl<S> OptionalFromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }
        <Self as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// Role `admin` or `super_admin`.
pub struct AdminAuth(pub Admin);

impl AdminAuth {
    const ROLES: &'static [Role] = &[Role::Admin, Role::SuperAdmin];
}

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerAuth(admin) =
            <BearerAuth as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !Self::ROLES.contains(&admin.role) {
            tracing::debug!(admin_id = %admin.id, role = %admin.role, "Admin access denied");
            return Err(AuthError::forbidden("Admin access required"));
        }
        Ok(AdminAuth(admin))
    }
}

/// Role `super_admin` only.
pub struct SuperAdminAuth(pub Admin);

impl<S> FromRequestParts<S> for SuperAdminAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerAuth(admin) =
            <BearerAuth as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        if !admin.role.is_super_admin() {
            tracing::debug!(admin_id = %admin.id, "SuperAdmin access denied");
            return Err(AuthError::super_admin_required());
        }
        Ok(SuperAdminAuth(admin))
    }
}
