//! Admin login, token refresh, logout and registration.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use pbcms_api::ApiResponse;
use pbcms_auth::{
    AuthError, BearerAuth, LoginRequest, RegisterRequest,
    cookies::{cleared_cookie, read_refresh_token, refresh_cookie},
};
use pbcms_core::Role;
use serde::Serialize;

use crate::error::AppResult;
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: SessionUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenData {
    pub access_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body?;
    let outcome = state.sessions.login(request).await?;
    let config = state.sessions.config();
    let jar = jar.add(refresh_cookie(
        &config.cookie,
        &outcome.refresh_token,
        config.refresh_token_lifetime,
    ));
    let data = LoginData {
        user: SessionUser {
            user_id: outcome.admin.id,
            username: outcome.admin.username,
            role: outcome.admin.role,
        },
        access_token: outcome.access_token,
    };
    Ok((jar, ApiResponse::with_message("Login successful", data)))
}

pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> AppResult<impl IntoResponse> {
    let config = state.sessions.config();
    let outcome = state
        .sessions
        .refresh(read_refresh_token(&jar, &config.cookie))
        .await?;
    let jar = jar.add(refresh_cookie(
        &config.cookie,
        &outcome.refresh_token,
        config.refresh_token_lifetime,
    ));
    Ok((
        jar,
        ApiResponse::with_message(
            "Access token refreshed",
            AccessTokenData {
                access_token: outcome.access_token,
            },
        ),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    BearerAuth(admin): BearerAuth,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    state.sessions.logout(&admin.id).await?;
    let jar = jar.add(cleared_cookie(&state.sessions.config().cookie));
    Ok((jar, ApiResponse::message("Logout successful")))
}

/// Open while no account exists; afterwards a super admin token is needed.
/// Credentials that fail to resolve are ignored while the store is empty.
pub async fn register(
    State(state): State<AppState>,
    actor: Result<Option<BearerAuth>, AuthError>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body?;
    let actor = match actor {
        Ok(actor) => actor.map(|BearerAuth(a)| a),
        Err(e) if state.sessions.is_bootstrap().await? => {
            tracing::debug!(error = %e, "Ignoring credentials during bootstrap registration");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let admin = state.sessions.register(request, actor.as_ref()).await?;
    state.dashboard.invalidate().await;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Admin registered successfully", admin.profile()),
    ))
}
