//! HTTP middleware for BCT Core
//!
//! - Bearer token authentication and the `AuthUser` extractor
//! - Admin role enforcement
//! - Request ID and metrics recording

pub mod auth;
pub mod metrics;
pub mod require_role;

pub use auth::{AuthError, AuthUser};
pub use metrics::{track_requests, RequestId};
pub use require_role::require_admin;
