//! Application state traits for dependency injection
//!
//! Handlers are generic over [`HasServices`] so the production `AppState`
//! and the in-memory test state share the same handler code.

use crate::config::Config;
use crate::jwt::JwtVerifier;
use crate::repository::{DeclarationTypeRepository, UserRepository};
use crate::service::{AdminUserService, DeclarationTypeService};
use metrics_exporter_prometheus::PrometheusHandle;

/// Trait for application state that provides access to all services.
pub trait HasServices: Clone + Send + Sync + 'static {
    /// The local user mirror repository type
    type UserRepo: UserRepository;
    /// The declaration type repository type
    type DeclarationRepo: DeclarationTypeRepository;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the user administration service
    fn admin_user_service(&self) -> &AdminUserService<Self::UserRepo>;

    /// Get the declaration type service
    fn declaration_type_service(&self) -> &DeclarationTypeService<Self::DeclarationRepo>;

    /// Get the bearer token verifier
    fn jwt_verifier(&self) -> &JwtVerifier;

    /// Prometheus handle, present when metrics are enabled
    fn prometheus_handle(&self) -> Option<&PrometheusHandle>;

    /// Check if the system is ready (database reachable)
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
