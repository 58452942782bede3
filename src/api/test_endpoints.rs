//! Role probe endpoints for checking token mapping end to end

use crate::middleware::auth::{AuthError, AuthUser};

fn probe(auth: &AuthUser, role: &str, reply: &'static str) -> Result<&'static str, AuthError> {
    auth.require_role(role)?;
    tracing::debug!(username = %auth.username, role, "role probe passed");
    Ok(reply)
}

#[utoipa::path(get, path = "/api/test/admin", tag = "Probes",
    responses((status = 200, body = String), (status = 403, description = "Role missing")))]
pub async fn admin(auth: AuthUser) -> Result<&'static str, AuthError> {
    probe(&auth, "ROLE_ADMIN", "ADMIN OK")
}

#[utoipa::path(get, path = "/api/test/agent", tag = "Probes",
    responses((status = 200, body = String), (status = 403, description = "Role missing")))]
pub async fn agent(auth: AuthUser) -> Result<&'static str, AuthError> {
    probe(&auth, "ROLE_AGENT", "AGENT OK")
}

#[utoipa::path(get, path = "/api/test/manager", tag = "Probes",
    responses((status = 200, body = String), (status = 403, description = "Role missing")))]
pub async fn manager(auth: AuthUser) -> Result<&'static str, AuthError> {
    probe(&auth, "ROLE_MANAGER", "MANAGER OK")
}

#[utoipa::path(get, path = "/api/test/auditor", tag = "Probes",
    responses((status = 200, body = String), (status = 403, description = "Role missing")))]
pub async fn auditor(auth: AuthUser) -> Result<&'static str, AuthError> {
    probe(&auth, "ROLE_AUDITOR", "AUDITOR OK")
}

/// Any authenticated caller, whatever its roles
#[utoipa::path(get, path = "/api/test/public/hello", tag = "Probes",
    responses((status = 200, body = String), (status = 401, description = "Missing or invalid token")))]
pub async fn public_hello(auth: AuthUser) -> &'static str {
    tracing::debug!(username = %auth.username, "public probe");
    "PUBLIC OK"
}
