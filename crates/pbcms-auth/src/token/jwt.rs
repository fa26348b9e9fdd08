//! JWT issuing and verification.
//!
//! Access and refresh tokens are both HS256 but signed with different
//! secrets, so a refresh token never passes as an access token and the
//! other way round.
//!
//! ## Example
//!
//! ```ignore
//! use pbcms_auth::token::jwt::{JwtService, TokenKind};
//!
//! let jwt = JwtService::new(&config);
//! let token = jwt.issue(TokenKind::Access, &admin)?;
//! let claims = jwt.verify(TokenKind::Access, &token)?;
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pbcms_core::{Admin, Role};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::AuthConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError { message: String },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token could not be parsed or its claims are unusable.
    #[error("Malformed token: {message}")]
    Malformed { message: String },
}

impl JwtError {
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the presented token rather than
    /// by this service.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::Malformed { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Which secret and lifetime a token uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so that rotation always yields a new value.
    pub jti: String,
}

impl Claims {
    /// Claims for `admin` valid for `lifetime` from now.
    #[must_use]
    pub fn for_admin(admin: &Admin, lifetime: Duration) -> Self {
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: admin.id.clone(),
            username: admin.username.clone(),
            role: admin.role,
            iat,
            exp: iat.saturating_add(ttl),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl Keys {
    fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }
}

/// Signs and verifies admin tokens.
pub struct JwtService {
    access: Keys,
    refresh: Keys,
    validation: Validation,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("access_lifetime", &self.access.lifetime)
            .field("refresh_lifetime", &self.refresh.lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            access: Keys::new(&config.access_secret, config.access_token_lifetime),
            refresh: Keys::new(&config.refresh_secret, config.refresh_token_lifetime),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of the given kind.
    #[must_use]
    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        self.keys(kind).lifetime
    }

    /// Issues a fresh token of `kind` for `admin`.
    pub fn issue(&self, kind: TokenKind, admin: &Admin) -> Result<String, JwtError> {
        self.encode(kind, &Claims::for_admin(admin, self.lifetime(kind)))
    }

    /// Signs arbitrary claims with the secret for `kind`.
    pub fn encode(&self, kind: TokenKind, claims: &Claims) -> Result<String, JwtError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)?;
        Ok(data.claims)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pbcms_core::generate_id;

    fn service() -> JwtService {
        JwtService::new(&AuthConfig::new(
            "access-secret-access-secret-access-secret",
            "refresh-secret-refresh-secret-refresh-secret",
        ))
    }

    fn admin() -> Admin {
        let now = OffsetDateTime::now_utc();
        Admin {
            id: generate_id(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            username: "jane".into(),
            password_hash: String::new(),
            role: Role::Admin,
            refresh_token: None,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            created_by: None,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let jwt = service();
        let admin = admin();
        let token = jwt.issue(TokenKind::Access, &admin).unwrap();
        let claims = jwt.verify(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.username, "jane");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_kinds_use_distinct_secrets() {
        let jwt = service();
        let refresh = jwt.issue(TokenKind::Refresh, &admin()).unwrap();
        assert!(matches!(
            jwt.verify(TokenKind::Access, &refresh),
            Err(JwtError::InvalidSignature)
        ));
        assert!(jwt.verify(TokenKind::Refresh, &refresh).is_ok());
    }

    #[test]
    fn test_every_token_is_unique() {
        let jwt = service();
        let admin = admin();
        let a = jwt.issue(TokenKind::Refresh, &admin).unwrap();
        let b = jwt.issue(TokenKind::Refresh, &admin).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = service();
        let mut claims = Claims::for_admin(&admin(), Duration::from_secs(60));
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = jwt.encode(TokenKind::Access, &claims).unwrap();
        assert!(matches!(
            jwt.verify(TokenKind::Access, &token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = service().verify(TokenKind::Access, "not.a.jwt").unwrap_err();
        assert!(matches!(err, JwtError::Malformed { .. }));
        assert!(err.is_validation_error());
    }
}
