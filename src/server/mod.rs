//! Server initialization and routing

use crate::api;
use crate::config::{Config, CorsConfig};
use crate::jwt::JwtVerifier;
use crate::keycloak::KeycloakClient;
use crate::middleware::{require_admin, track_requests};
use crate::openapi;
use crate::repository::{
    declaration_type::DeclarationTypeRepositoryImpl, user::UserRepositoryImpl,
};
use crate::service::{AdminUserService, DeclarationTypeService};
use crate::state::HasServices;
use anyhow::{Context, Result};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Upper bound on handler time, Keycloak round trips included
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub admin_user_service: Arc<AdminUserService<UserRepositoryImpl>>,
    pub declaration_type_service: Arc<DeclarationTypeService<DeclarationTypeRepositoryImpl>>,
    pub jwt_verifier: JwtVerifier,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Connect to the database and wire services
    pub async fn init(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<Self> {
        let db_pool = MySqlPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;
        info!("Connected to database");

        let keycloak_client = KeycloakClient::new(config.keycloak.clone())?;
        let jwt_verifier = JwtVerifier::new(config.jwt.clone())?;

        let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
        let declaration_repo = Arc::new(DeclarationTypeRepositoryImpl::new(db_pool.clone()));

        let admin_user_service = Arc::new(AdminUserService::new(
            user_repo,
            keycloak_client,
            config.authorization.role_prefix.clone(),
        ));
        let declaration_type_service = Arc::new(DeclarationTypeService::new(declaration_repo));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            admin_user_service,
            declaration_type_service,
            jwt_verifier,
            prometheus_handle,
        })
    }
}

impl HasServices for AppState {
    type UserRepo = UserRepositoryImpl;
    type DeclarationRepo = DeclarationTypeRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn admin_user_service(&self) -> &AdminUserService<Self::UserRepo> {
        &self.admin_user_service
    }

    fn declaration_type_service(&self) -> &DeclarationTypeService<Self::DeclarationRepo> {
        &self.declaration_type_service
    }

    fn jwt_verifier(&self) -> &JwtVerifier {
        &self.jwt_verifier
    }

    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        self.prometheus_handle.as_ref()
    }

    async fn check_ready(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok()
    }
}

/// Run the server until Ctrl+C or SIGTERM
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let http_addr = config.http_addr();
    let state = AppState::init(config, prometheus_handle).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// CORS for the configured front-end origins, with credentials
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Credentials rule out wildcard headers, so common ones are listed
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// Build the HTTP router with generic state type
///
/// Works with both the production `AppState` and test states implementing
/// `HasServices`.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let cors = build_cors_layer(&state.config().cors);

    let admin = Router::new()
        // Users
        .route(
            "/users",
            get(api::admin_user::list_users::<S>).post(api::admin_user::create_user::<S>),
        )
        .route("/users/search", get(api::admin_user::search_users::<S>))
        .route(
            "/users/{id}",
            get(api::admin_user::get_user::<S>)
                .put(api::admin_user::update_user::<S>)
                .delete(api::admin_user::delete_user::<S>),
        )
        .route(
            "/users/{id}/status",
            patch(api::admin_user::update_status::<S>),
        )
        .route(
            "/users/{id}/reset-password",
            post(api::admin_user::reset_password::<S>),
        )
        // Roles
        .route(
            "/users/{id}/roles",
            get(api::role::get_user_roles::<S>)
                .post(api::role::assign_roles::<S>)
                .delete(api::role::remove_roles::<S>),
        )
        .route("/roles", get(api::role::list_roles::<S>))
        .route("/roles/{name}/users", get(api::role::users_by_role::<S>))
        // Local mirror
        .route("/local-users", get(api::admin_user::list_local_users::<S>))
        .route(
            "/local-users/{keycloak_id}",
            get(api::admin_user::get_local_user::<S>),
        )
        .route("/sync", post(api::admin_user::sync_users::<S>))
        // Declaration types
        .route(
            "/declaration-types",
            get(api::declaration_type::list::<S>).post(api::declaration_type::create::<S>),
        )
        .route(
            "/declaration-types/{id}",
            put(api::declaration_type::update::<S>).delete(api::declaration_type::delete::<S>),
        )
        .route(
            "/declaration-types/{id}/toggle",
            patch(api::declaration_type::toggle::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin::<S>,
        ));

    Router::new()
        // System endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::health::metrics::<S>))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        // Role probes
        .route("/api/test/admin", get(api::test_endpoints::admin))
        .route("/api/test/agent", get(api::test_endpoints::agent))
        .route("/api/test/manager", get(api::test_endpoints::manager))
        .route("/api/test/auditor", get(api::test_endpoints::auditor))
        .route(
            "/api/test/public/hello",
            get(api::test_endpoints::public_hello),
        )
        .nest("/api/admin", admin)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_requests))
        .layer(cors)
        .with_state(state)
}
