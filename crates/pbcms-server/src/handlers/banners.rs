use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use pbcms_api::ApiResponse;
use pbcms_auth::BearerAuth;
use pbcms_storage::{BannerQuery, Pagination, StatusFilter};
use serde::Deserialize;
use serde_json::json;

use super::{query_number, read_multipart};
use crate::content::BannerForm;
use crate::error::AppResult;
use crate::server::AppState;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

async fn read_form(multipart: Multipart) -> AppResult<BannerForm> {
    let mut form = BannerForm::default();
    let image =
        read_multipart(multipart, IMAGE_FIELD, |name, value| form.set_text(name, value)).await?;
    form.image = image;
    Ok(form)
}

pub async fn active(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let banner = state.banners.active().await?;
    Ok(ApiResponse::data(json!({ "banner": banner })))
}

pub async fn list(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let query = BannerQuery {
        pagination: Pagination::new(
            query_number(params.page.as_deref()),
            query_number(params.limit.as_deref()),
        ),
        status: StatusFilter::parse(params.status.as_deref()),
    };
    Ok(ApiResponse::data(state.banners.list(&query).await?))
}

pub async fn create(
    State(state): State<AppState>,
    BearerAuth(admin): BearerAuth,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_form(multipart?).await?;
    let banner = state.banners.create(form, &admin.username).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Banner created successfully", json!({ "banner": banner })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_form(multipart?).await?;
    let banner = state.banners.update(&id, form).await?;
    Ok(ApiResponse::with_message(
        "Banner updated successfully",
        json!({ "banner": banner }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.banners.delete(&id).await?;
    Ok(ApiResponse::message("Banner deleted successfully"))
}
