use axum::{Json, extract::State, response::IntoResponse};
use pbcms_auth::{AdminAuth, SuperAdminAuth};
use serde::Serialize;

use crate::error::AppResult;
use crate::server::AppState;

/// Dashboard bodies carry the caller's role next to the data.
#[derive(Debug, Serialize)]
pub struct RoleScoped<T> {
    pub success: bool,
    pub role: &'static str,
    pub data: T,
}

impl<T: Serialize> RoleScoped<T> {
    fn new(role: &'static str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            role,
            data,
        })
    }
}

pub async fn super_admin(
    State(state): State<AppState>,
    _auth: SuperAdminAuth,
) -> AppResult<impl IntoResponse> {
    let data = state.dashboard.super_admin().await?;
    Ok(RoleScoped::new("superAdmin", data))
}

pub async fn admin(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> AppResult<impl IntoResponse> {
    let data = state.dashboard.admin().await?;
    Ok(RoleScoped::new("admin", data))
}
