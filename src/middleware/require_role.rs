//! Role enforcement middleware for the admin API
//!
//! Every `/api/admin` route requires a valid bearer token whose realm roles
//! include the configured admin role.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::auth::{authenticate, AuthError};
use crate::state::HasServices;

/// Admin gate: 401 without a valid token, 403 without the admin role.
///
/// The verified caller is stored in the request extensions for handlers.
pub async fn require_admin<S: HasServices>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = match authenticate(request.headers(), state.jwt_verifier()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    let admin_role = &state.config().authorization.admin_role;
    if !user.has_role(admin_role) {
        tracing::debug!(username = %user.username, "admin role missing");
        return AuthError::Forbidden("Access denied".to_string()).into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}
