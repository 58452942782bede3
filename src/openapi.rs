//! OpenAPI 3.0 documentation assembly
//!
//! Aggregates handler path annotations and domain schemas into a single
//! document served at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BCT Core API",
        version = "0.1.0",
        description = "User and declaration type administration backed by Keycloak"
    ),
    tags(
        (name = "System", description = "Health checks and system status"),
        (name = "Users", description = "Keycloak user administration"),
        (name = "Roles", description = "Realm role listing and assignment"),
        (name = "Local Mirror", description = "Local copy of Keycloak users"),
        (name = "Declaration Types", description = "Declaration type catalogue"),
        (name = "Probes", description = "Role mapping probes"),
    ),
    security(
        ("bearer_jwt" = [])
    ),
    components(
        schemas(
            crate::api::MessageResponse,
            crate::api::PageQuery,
            crate::api::health::HealthResponse,
            crate::domain::UserDto,
            crate::domain::RoleDto,
            crate::domain::CreateUserRequest,
            crate::domain::CreateUserResponse,
            crate::domain::UpdateUserRequest,
            crate::domain::LocalUser,
            crate::domain::SyncReport,
            crate::domain::DeclarationType,
            crate::domain::DeclarationTypeInput,
            crate::domain::DeclarationFormat,
            crate::domain::DeclarationFrequence,
        ),
    ),
    paths(
        // ── System ─────────────────────────────────────────────────
        crate::api::health::health,
        crate::api::health::ready,

        // ── Users ──────────────────────────────────────────────────
        crate::api::admin_user::list_users,
        crate::api::admin_user::search_users,
        crate::api::admin_user::get_user,
        crate::api::admin_user::create_user,
        crate::api::admin_user::update_user,
        crate::api::admin_user::delete_user,
        crate::api::admin_user::update_status,
        crate::api::admin_user::reset_password,

        // ── Roles ──────────────────────────────────────────────────
        crate::api::role::list_roles,
        crate::api::role::get_user_roles,
        crate::api::role::assign_roles,
        crate::api::role::remove_roles,
        crate::api::role::users_by_role,

        // ── Local mirror ───────────────────────────────────────────
        crate::api::admin_user::list_local_users,
        crate::api::admin_user::get_local_user,
        crate::api::admin_user::sync_users,

        // ── Declaration types ──────────────────────────────────────
        crate::api::declaration_type::list,
        crate::api::declaration_type::create,
        crate::api::declaration_type::update,
        crate::api::declaration_type::delete,
        crate::api::declaration_type::toggle,

        // ── Probes ─────────────────────────────────────────────────
        crate::api::test_endpoints::admin,
        crate::api::test_endpoints::agent,
        crate::api::test_endpoints::manager,
        crate::api::test_endpoints::auditor,
        crate::api::test_endpoints::public_hello,
    ),
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn build() -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        if let Some(c) = doc.components.as_mut() {
            c.security_schemes.insert(
                "bearer_jwt".to_string(),
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
        doc
    }
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::build())
}
