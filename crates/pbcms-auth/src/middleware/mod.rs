//! Request guards for admin routes.
//!
//! - [`BearerAuth`]: any active admin with a valid access token
//! - [`AdminAuth`]: role `admin` or `super_admin`
//! - [`SuperAdminAuth`]: role `super_admin`
//!
//! Rejections render as the standard `{success: false, message}` body.

pub mod auth;
pub mod error;

pub use auth::{AdminAuth, AuthState, BearerAuth, SuperAdminAuth};
