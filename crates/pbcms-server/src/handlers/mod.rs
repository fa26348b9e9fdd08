//! HTTP handlers. Each returns [`AppResult`] and renders successes through
//! [`pbcms_api::ApiResponse`].

pub mod auth;
pub mod banners;
pub mod dashboard;
pub mod health;
pub mod services;

use axum::extract::Multipart;
use axum::http::Uri;
use pbcms_api::ApiError;

use crate::error::AppResult;
use crate::media::ImageUpload;

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}

/// Drain a multipart body. The part named `file_field` becomes the image;
/// every other part is handed to `set_text`.
pub(crate) async fn read_multipart<F>(
    mut multipart: Multipart,
    file_field: &str,
    mut set_text: F,
) -> AppResult<Option<ImageUpload>>
where
    F: FnMut(&str, String) -> bool,
{
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await?;
            image = Some(ImageUpload {
                bytes: bytes.to_vec(),
                content_type,
                file_name,
            });
        } else {
            let value = field.text().await?;
            if !set_text(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }
    Ok(image)
}

/// Lenient numeric query parameter: anything unparsable is treated as absent.
pub(crate) fn query_number(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// `"true"` → `Some(true)`, any other value → `Some(false)`, absent → `None`.
pub(crate) fn query_flag(raw: Option<&str>) -> Option<bool> {
    raw.map(|v| v.trim() == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_helpers() {
        assert_eq!(query_number(Some("3")), Some(3));
        assert_eq!(query_number(Some("-1")), None);
        assert_eq!(query_number(Some("abc")), None);
        assert_eq!(query_flag(Some("true")), Some(true));
        assert_eq!(query_flag(Some("yes")), Some(false));
        assert_eq!(query_flag(None), None);
    }
}
