use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use pbcms_api::ApiResponse;
use pbcms_auth::BearerAuth;
use pbcms_storage::{Pagination, ServiceQuery, StatusFilter};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{query_flag, query_number, read_multipart};
use crate::content::ServiceForm;
use crate::content::services::{parse_order_data, publish_flag};
use crate::error::AppResult;
use crate::server::AppState;

const HERO_IMAGE_FIELD: &str = "heroImage";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveParams {
    pub show_on_homepage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub show_on_homepage: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ServiceQuery {
        ServiceQuery {
            pagination: Pagination::new(
                query_number(self.page.as_deref()),
                query_number(self.limit.as_deref()),
            ),
            status: StatusFilter::parse(self.status.as_deref()),
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            show_on_homepage: query_flag(self.show_on_homepage.as_deref()),
        }
    }
}

async fn read_form(multipart: Multipart) -> AppResult<ServiceForm> {
    let mut form = ServiceForm::default();
    let image =
        read_multipart(multipart, HERO_IMAGE_FIELD, |name, value| form.set_text(name, value))
            .await?;
    form.hero_image = image;
    Ok(form)
}

pub async fn active(
    State(state): State<AppState>,
    Query(params): Query<ActiveParams>,
) -> AppResult<impl IntoResponse> {
    let services = state
        .services
        .active(query_flag(params.show_on_homepage.as_deref()))
        .await?;
    Ok(ApiResponse::data(json!({ "services": services })))
}

pub async fn by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let service = state.services.by_slug(&slug).await?;
    Ok(ApiResponse::data(json!({ "service": service })))
}

pub async fn list(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let listing = state.services.list(&params.into_query()).await?;
    Ok(ApiResponse::data(listing))
}

pub async fn create(
    State(state): State<AppState>,
    BearerAuth(admin): BearerAuth,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_form(multipart?).await?;
    let service = state.services.create(form, &admin.username).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Service created successfully", json!({ "service": service })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    BearerAuth(admin): BearerAuth,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_form(multipart?).await?;
    let service = state.services.update(&id, form, &admin.username).await?;
    Ok(ApiResponse::with_message(
        "Service updated successfully",
        json!({ "service": service }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: BearerAuth,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.services.delete(&id).await?;
    Ok(ApiResponse::message("Service deleted successfully"))
}

pub async fn publish(
    State(state): State<AppState>,
    BearerAuth(admin): BearerAuth,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let is_published = publish_flag(&body)?;
    let service = state
        .services
        .set_published(&id, is_published, &admin.username)
        .await?;
    let message = if is_published {
        "Service published successfully"
    } else {
        "Service unpublished successfully"
    };
    Ok(ApiResponse::with_message(message, json!({ "service": service })))
}

pub async fn reorder(
    State(state): State<AppState>,
    _auth: BearerAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let orders = parse_order_data(&body)?;
    state.services.reorder(&orders).await?;
    Ok(ApiResponse::message("Services reordered successfully"))
}
