use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post, put},
};
use pbcms_auth::{AuthState, JwtService, SessionService};
use pbcms_storage::{AdminStorage, BannerStorage, ServiceStorage};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::cache::{CacheBackend, create_cache_backend};
use crate::config::{AppConfig, Environment, StorageBackend};
use crate::content::{Banners, Dashboard, ServiceCatalog};
use crate::handlers;
use crate::media::{MediaStore, create_media_store};
use crate::middleware::{self as app_middleware, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RateLimiter};

/// Dev server origins allowed outside production.
const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// The three record stores, usually backed by one connection.
#[derive(Clone)]
pub struct Stores {
    pub admins: Arc<dyn AdminStorage>,
    pub services: Arc<dyn ServiceStorage>,
    pub banners: Arc<dyn BannerStorage>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: AdminStorage + ServiceStorage + BannerStorage + 'static,
    {
        Self {
            admins: backend.clone(),
            services: backend.clone(),
            banners: backend,
        }
    }
}

/// Long-lived clients shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub services: ServiceCatalog,
    pub banners: Banners,
    pub dashboard: Dashboard,
    pub cache: CacheBackend,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        cfg: &AppConfig,
        stores: Stores,
        cache: CacheBackend,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(&cfg.auth));
        let sessions = Arc::new(SessionService::new(
            stores.admins.clone(),
            jwt,
            cfg.auth.clone(),
        ));
        let max_upload = cfg.media.max_upload_bytes;
        Self {
            sessions,
            services: ServiceCatalog::new(stores.services, cache.clone(), media.clone(), max_upload),
            banners: Banners::new(stores.banners, cache.clone(), media, max_upload),
            dashboard: Dashboard::new(stores.admins, cache.clone()),
            cache,
            environment: cfg.server.environment,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.sessions.clone())
    }
}

fn api_routes() -> Router<AppState> {
    let register = post(handlers::auth::register);
    let login = post(handlers::auth::login);
    Router::new()
        // Auth
        .route("/auth/register", register.clone())
        .route("/auth/admin/register", register)
        .route("/auth/login", login.clone())
        .route("/auth/admin/login", login)
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        // Dashboard
        .route("/dashboard/admin", get(handlers::dashboard::admin))
        .route("/dashboard/super-admin", get(handlers::dashboard::super_admin))
        // Banners
        .route("/banners/active", get(handlers::banners::active))
        .route(
            "/banners",
            get(handlers::banners::list).post(handlers::banners::create),
        )
        .route(
            "/banners/{id}",
            put(handlers::banners::update).delete(handlers::banners::delete),
        )
        // Services
        .route("/services/active", get(handlers::services::active))
        .route("/services/slug/{slug}", get(handlers::services::by_slug))
        .route("/services/reorder", patch(handlers::services::reorder))
        .route(
            "/services",
            get(handlers::services::list).post(handlers::services::create),
        )
        .route(
            "/services/{id}",
            put(handlers::services::update).delete(handlers::services::delete),
        )
        .route("/services/{id}/publish", patch(handlers::services::publish))
}

fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let production = cfg.server.environment.is_production();
    let mut origins: Vec<HeaderValue> = cfg
        .cors
        .frontend_url
        .iter()
        .filter_map(|url| HeaderValue::from_str(url.trim().trim_end_matches('/')).ok())
        .collect();
    if !production {
        origins.extend(DEV_ORIGINS.into_iter().map(HeaderValue::from_static));
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([header::CONTENT_LENGTH, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING])
        .max_age(Duration::from_secs(if production { 7200 } else { 86400 }))
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let mut api = api_routes();
    if cfg.rate_limit.enabled {
        let limiter = RateLimiter::new(&cfg.rate_limit);
        api = api.route_layer(middleware::from_fn_with_state(
            limiter,
            app_middleware::rate_limit,
        ));
    }

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state)
        // Middleware stack, innermost first: security headers, body limit,
        // compression, cors, trace, request id
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
        .layer(CompressionLayer::new())
        .layer(cors_layer(cfg))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

pub struct PbcmsServer {
    addr: SocketAddr,
    app: Router,
    cache: CacheBackend,
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    stores: Option<Stores>,
    media: Option<Arc<dyn MediaStore>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Use these stores instead of connecting to the configured backend.
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = Some(media);
        self
    }

    pub async fn build(self) -> anyhow::Result<PbcmsServer> {
        let cfg = self.config;
        let stores = match self.stores {
            Some(stores) => stores,
            None => connect_stores(&cfg).await?,
        };
        let media = match self.media {
            Some(media) => media,
            None => create_media_store(&cfg.media)?,
        };
        let cache = create_cache_backend(&cfg.redis).await;

        let state = AppState::new(&cfg, stores, cache.clone(), media);
        Ok(PbcmsServer {
            addr: cfg.addr(),
            app: build_app(state, &cfg),
            cache,
        })
    }
}

async fn connect_stores(cfg: &AppConfig) -> anyhow::Result<Stores> {
    match cfg.storage.backend {
        StorageBackend::Mongo => {
            let storage = pbcms_db_mongo::connect_storage(&cfg.storage.mongo).await?;
            tracing::info!(
                database = cfg.storage.mongo.database.as_deref().unwrap_or("(from url)"),
                "Connected to MongoDB"
            );
            Ok(Stores::from_backend(Arc::new(storage)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on restart");
            Ok(Stores::from_backend(pbcms_db_memory::create_memory_storage()))
        }
    }
}

impl PbcmsServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        self.cache.close();
        tracing::info!("cache closed");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
