//! BCT Core - administrative backend
//!
//! User, realm-role and declaration-type administration over a Keycloak
//! realm, with a local MySQL mirror of the realm's users.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod keycloak;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
