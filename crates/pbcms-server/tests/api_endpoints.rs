//! HTTP surface tests against the in-memory store and media host.

use std::net::SocketAddr;
use std::sync::Arc;

use assert_json_diff::{assert_json_eq, assert_json_include};
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use pbcms_auth::AuthConfig;
use pbcms_db_memory::create_memory_storage;
use pbcms_server::{AppConfig, AppState, CacheBackend, MemoryMediaStore, Stores, build_app};
use serde_json::{Value, json};
use tower::ServiceExt;

const ACCESS: &str = "test-access-secret-0123456789abcdef";
const REFRESH: &str = "test-refresh-secret-0123456789abcdef";
const PASSWORD: &str = "Str0ng!pass";
const BOUNDARY: &str = "pbcms-test-boundary";
const DESCRIPTION: &str =
    "Full-service research programmes designed, fielded and analysed in house.";

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth = AuthConfig::new(ACCESS, REFRESH);
    cfg.rate_limit.enabled = false;
    cfg
}

fn app_with(cfg: &AppConfig) -> (Router, Arc<MemoryMediaStore>) {
    let media = Arc::new(MemoryMediaStore::new());
    let state = AppState::new(
        cfg,
        Stores::from_backend(create_memory_storage()),
        CacheBackend::new_local(),
        media.clone(),
    );
    (build_app(state, cfg), media)
}

fn app() -> Router {
    app_with(&config()).0
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        headers,
        body,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart body with text parts and an optional PNG under `file_field`.
fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file_field: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(field) = file_field {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"hero.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    request(method, uri, Some(token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn register_body(username: &str) -> Value {
    json!({
        "name": format!("{username} account"),
        "email": format!("{username}@pbgroup.example"),
        "username": username,
        "password": PASSWORD,
    })
}

/// `name=value` of the refresh cookie set by a response.
fn refresh_cookie(headers: &HeaderMap) -> String {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

async fn register(app: &Router, username: &str, token: Option<&str>) -> Reply {
    send(
        app,
        json_request(Method::POST, "/api/auth/register", token, register_body(username)),
    )
    .await
}

async fn login(app: &Router, username: &str) -> Reply {
    send(
        app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"username": username, "password": PASSWORD}),
        ),
    )
    .await
}

/// Register the first account and return its access token.
async fn root_token(app: &Router) -> String {
    assert_eq!(register(app, "root", None).await.status, StatusCode::CREATED);
    let reply = login(app, "root").await;
    reply.body["data"]["accessToken"].as_str().unwrap().to_string()
}

fn service_fields<'a>(title: &'a str, short_description: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("shortDescription", short_description),
        ("description", DESCRIPTION),
        ("isPublished", "true"),
        ("researchTypes", r#"["Quantitative","Qualitative"]"#),
    ]
}

#[tokio::test]
async fn health_reports_environment_and_sets_headers() {
    let reply = send(&app(), get("/health", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "OK");
    assert_eq!(reply.body["environment"], "development");
    assert!(reply.body["timestamp"].is_string());
    assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    assert_eq!(reply.headers["x-frame-options"], "DENY");
    assert!(reply.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn request_id_is_propagated() {
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app(), req).await;
    assert_eq!(reply.headers["x-request-id"], "req-42");
}

#[tokio::test]
async fn unknown_route_falls_back_to_404() {
    let reply = send(&app(), get("/api/unknown", None)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(
        reply.body,
        json!({"success": false, "message": "Route /api/unknown not found"})
    );
}

#[tokio::test]
async fn auth_cookie_flow() {
    let app = app();

    let first = register(&app, "root", None).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["message"], "Admin registered successfully");
    assert_eq!(first.body["data"]["role"], "super_admin");

    let anonymous = register(&app, "second", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let logged_in = login(&app, "root").await;
    assert_eq!(logged_in.status, StatusCode::OK);
    assert_eq!(logged_in.body["message"], "Login successful");
    assert_eq!(logged_in.body["data"]["user"]["username"], "root");
    assert_eq!(logged_in.body["data"]["user"]["role"], "super_admin");
    let access = logged_in.body["data"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    let first_cookie = refresh_cookie(&logged_in.headers);
    let set_cookie = logged_in.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let refresh = |cookie: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let refreshed = send(&app, refresh(first_cookie.clone())).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert_eq!(refreshed.body["message"], "Access token refreshed");
    assert!(refreshed.body["data"]["accessToken"].is_string());
    let rotated_cookie = refresh_cookie(&refreshed.headers);
    assert_ne!(rotated_cookie, first_cookie);

    let replay = send(&app, refresh(first_cookie)).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    let missing = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "Refresh token not found");

    let logout = send(
        &app,
        request(Method::POST, "/api/auth/logout", Some(&access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logout successful");
    assert!(
        logout.headers[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let after_logout = send(&app, refresh(rotated_cookie)).await;
    assert_eq!(after_logout.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_aliases_and_bad_credentials() {
    let app = app();
    root_token(&app).await;

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/admin/login",
            None,
            json!({"username": "root", "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Invalid credentials");

    let reply = send(
        &app,
        json_request(Method::POST, "/api/auth/admin/login", None, json!({})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = app();
    let reply = send(&app, get("/api/services", None)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, get("/api/services", Some("not-a-token"))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn short_description_minimum_is_fifty_characters() {
    let app = app();
    let token = root_token(&app).await;

    let short = "a".repeat(49);
    let reply = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/services",
            &token,
            &service_fields("Too Short", &short),
            Some("heroImage"),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["message"],
        "Short description must be at least 50 characters"
    );

    let exact = "a".repeat(50);
    let reply = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/services",
            &token,
            &service_fields("Just Right", &exact),
            Some("heroImage"),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_json_include!(
        actual: reply.body,
        expected: json!({
            "success": true,
            "message": "Service created successfully",
            "data": {"service": {
                "slug": "just-right",
                "createdBy": "root",
                "isPublished": true,
                "showOnHomepage": true,
                "researchTypes": ["Quantitative", "Qualitative"],
            }},
        })
    );
}

#[tokio::test]
async fn service_writes_invalidate_cached_reads() {
    let app = app();
    let token = root_token(&app).await;

    let empty = send(&app, get("/api/services/active", None)).await;
    assert_eq!(empty.body["data"]["services"], json!([]));
    let listing = send(&app, get("/api/services", Some(&token))).await;
    assert_eq!(listing.body["data"]["pagination"]["totalServices"], 0);

    let created = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/services",
            &token,
            &service_fields("Brand Tracking", DESCRIPTION),
            Some("heroImage"),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["data"]["service"]["_id"]
        .as_str()
        .unwrap()
        .to_string();

    let active = send(&app, get("/api/services/active", None)).await;
    assert_eq!(active.body["data"]["services"][0]["slug"], "brand-tracking");
    let listing = send(&app, get("/api/services", Some(&token))).await;
    assert_eq!(listing.body["data"]["pagination"]["totalServices"], 1);
    let by_slug = send(&app, get("/api/services/slug/brand-tracking", None)).await;
    assert_eq!(by_slug.body["data"]["service"]["subtitle"], Value::Null);

    let updated = send(
        &app,
        multipart_request(
            Method::PUT,
            &format!("/api/services/{id}"),
            &token,
            &[("subtitle", "Continuous measurement")],
            None,
        ),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Service updated successfully");

    let by_slug = send(&app, get("/api/services/slug/brand-tracking", None)).await;
    assert_eq!(
        by_slug.body["data"]["service"]["subtitle"],
        "Continuous measurement"
    );

    let unpublished = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/api/services/{id}/publish"),
            Some(&token),
            json!({"isPublished": "false"}),
        ),
    )
    .await;
    assert_eq!(unpublished.body["message"], "Service unpublished successfully");
    let active = send(&app, get("/api/services/active", None)).await;
    assert_eq!(active.body["data"]["services"], json!([]));
    let hidden = send(&app, get("/api/services/slug/brand-tracking", None)).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let deleted = send(
        &app,
        request(Method::DELETE, &format!("/api/services/{id}"), Some(&token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(deleted.body["message"], "Service deleted successfully");
    let listing = send(&app, get("/api/services", Some(&token))).await;
    assert_eq!(listing.body["data"]["pagination"]["totalServices"], 0);
}

#[tokio::test]
async fn reorder_validates_body() {
    let app = app();
    let token = root_token(&app).await;

    let reply = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/services/reorder",
            Some(&token),
            json!({"orderData": []}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "orderData cannot be empty");

    let reply = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/services/reorder",
            Some(&token),
            json!({"orderData": [{"serviceId": "missing", "displayOrder": 2}]}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Services reordered successfully");
}

#[tokio::test]
async fn banner_lifecycle() {
    let (app, media) = app_with(&config());
    let token = root_token(&app).await;

    let none = send(&app, get("/api/banners/active", None)).await;
    assert_eq!(none.body, json!({"success": true, "data": {"banner": null}}));

    let missing_image = send(
        &app,
        multipart_request(Method::POST, "/api/banners", &token, &[], None),
    )
    .await;
    assert_eq!(missing_image.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_image.body["message"], "Image file is required");

    let created = send(
        &app,
        multipart_request(
            Method::POST,
            "/api/banners",
            &token,
            &[("link", "https://pbgroup.example/survey")],
            Some("image"),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["banner"]["altText"], "Poster");
    let id = created.body["data"]["banner"]["_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(media.len(), 1);

    let active = send(&app, get("/api/banners/active", None)).await;
    assert_eq!(
        active.body["data"]["banner"]["link"],
        "https://pbgroup.example/survey"
    );

    let listing = send(&app, get("/api/banners?status=active", Some(&token))).await;
    assert_eq!(listing.body["data"]["pagination"]["totalBanners"], 1);

    let deleted = send(
        &app,
        request(Method::DELETE, &format!("/api/banners/{id}"), Some(&token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(deleted.body["message"], "Banner deleted successfully");
    assert!(media.is_empty());

    let active = send(&app, get("/api/banners/active", None)).await;
    assert_eq!(active.body["data"]["banner"], Value::Null);
}

#[tokio::test]
async fn dashboards_are_role_scoped() {
    let app = app();
    let root = root_token(&app).await;

    let super_view = send(&app, get("/api/dashboard/super-admin", Some(&root))).await;
    assert_eq!(super_view.status, StatusCode::OK);
    assert_eq!(super_view.body["role"], "superAdmin");
    assert_eq!(super_view.body["data"]["totalAdmins"], 0);

    let created = register(&app, "editor", Some(&root)).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["role"], "admin");

    let super_view = send(&app, get("/api/dashboard/super-admin", Some(&root))).await;
    assert_eq!(super_view.body["data"]["totalAdmins"], 1);
    assert_eq!(super_view.body["data"]["admins"]["count"], 1);
    assert_eq!(
        super_view.body["data"]["admins"]["list"][0]["email"],
        "editor@pbgroup.example"
    );

    let editor = login(&app, "editor").await.body["data"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    let forbidden = send(&app, get("/api/dashboard/super-admin", Some(&editor))).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let admin_view = send(&app, get("/api/dashboard/admin", Some(&editor))).await;
    assert_eq!(admin_view.status, StatusCode::OK);
    assert_json_eq!(
        admin_view.body,
        json!({"success": true, "role": "admin", "data": {"totalAdmins": 1}})
    );

    let by_editor = register(&app, "third", Some(&editor)).await;
    assert_eq!(by_editor.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_requests_are_rate_limited() {
    let mut cfg = config();
    cfg.rate_limit.enabled = true;
    cfg.rate_limit.max_requests = 2;
    let (app, _) = app_with(&cfg);

    for remaining in ["1", "0"] {
        let reply = send(&app, get("/api/banners/active", None)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers["x-ratelimit-remaining"], remaining);
    }

    let limited = send(&app, get("/api/banners/active", None)).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["message"], "Too many requests");
    assert!(limited.headers.contains_key(header::RETRY_AFTER));

    let health = send(&app, get("/health", None)).await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn rotating_forwarded_for_shares_the_peer_budget() {
    let mut cfg = config();
    cfg.rate_limit.enabled = true;
    cfg.rate_limit.max_requests = 2;
    let (app, _) = app_with(&cfg);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let mut req = Request::builder()
            .uri("/api/banners/active")
            .header("x-forwarded-for", format!("198.51.100.{i}"))
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 40000))));
        statuses.push(send(&app, req).await.status);
    }
    assert_eq!(
        statuses,
        [
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}

#[tokio::test]
async fn stale_token_does_not_block_bootstrap_registration() {
    let app = app();
    let first = register(&app, "root", Some("stale-token-from-old-session")).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["role"], "super_admin");

    let second = register(&app, "second", Some("stale-token-from-old-session")).await;
    assert_eq!(second.status, StatusCode::UNAUTHORIZED);
    assert_eq!(second.body["code"], "TOKEN_EXPIRED");
}
