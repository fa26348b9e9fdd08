//! Admin authentication for the pbcms content server.
//!
//! - short-lived HS256 access tokens and long-lived refresh tokens signed
//!   with a separate secret
//! - refresh tokens stored on the account, rotated on every use and
//!   revoked on logout
//! - Argon2id password hashing and login lockout
//! - axum extractors guarding admin routes
//!
//! ```ignore
//! use pbcms_auth::{AuthConfig, JwtService, SessionService};
//!
//! let jwt = Arc::new(JwtService::new(&config));
//! let sessions = SessionService::new(admin_storage, jwt, config);
//! let outcome = sessions.login(request).await?;
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

pub use config::{AuthConfig, CookieConfig};
pub use error::{AuthError, AuthResult};
pub use middleware::{AdminAuth, AuthState, BearerAuth, SuperAdminAuth};
pub use session::{LoginOutcome, LoginRequest, RefreshOutcome, RegisterRequest, SessionService};
pub use token::{Claims, JwtError, JwtService, TokenKind};
