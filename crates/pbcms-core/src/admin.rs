//! Administrator accounts.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Account role. Exactly one `SuperAdmin` may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// A stored administrator account.
///
/// Carries the password hash and the live refresh token, so it is never
/// serialized directly; responses use [`AdminProfile`] or [`AdminListItem`].
#[derive(Clone, PartialEq)]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    /// The single refresh token currently accepted for this account.
    pub refresh_token: Option<String>,
    pub login_attempts: u32,
    pub lock_until: Option<OffsetDateTime>,
    pub last_login: Option<OffsetDateTime>,
    pub created_by: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Admin {
    pub fn is_locked(&self, now: OffsetDateTime) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }

    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    pub fn list_item(&self) -> AdminListItem {
        AdminListItem {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for Admin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admin")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("login_attempts", &self.login_attempts)
            .field("lock_until", &self.lock_until)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Public view returned after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Row in the super-admin dashboard listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Admin {
        let at = datetime!(2024-01-01 00:00 UTC);
        Admin {
            id: "65a1b2c3d4e5f60718293a4b".into(),
            name: "Root".into(),
            email: "root@example.com".into(),
            username: "root".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::SuperAdmin,
            refresh_token: Some("token".into()),
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            created_by: None,
            is_active: true,
            email_verified: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" super_admin ".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!("superadmin".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
    }

    #[test]
    fn lock_respects_current_time() {
        let mut admin = sample();
        admin.lock_until = Some(datetime!(2024-01-01 00:15 UTC));
        assert!(admin.is_locked(datetime!(2024-01-01 00:10 UTC)));
        assert!(!admin.is_locked(datetime!(2024-01-01 00:20 UTC)));
    }

    #[test]
    fn debug_hides_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("argon2"));
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("has_refresh_token: true"));
    }

    #[test]
    fn profile_uses_wire_names() {
        let json = serde_json::to_value(sample().profile()).unwrap();
        assert_eq!(json["_id"], "65a1b2c3d4e5f60718293a4b");
        assert_eq!(json["role"], "super_admin");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert!(json.get("passwordHash").is_none());
    }
}
