//! Bearer token authentication
//!
//! Provides the `AuthUser` extractor and the error responses shared by the
//! authentication and role-gating middleware.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::jwt::{JwtVerifier, KeycloakClaims};
use crate::state::HasServices;

/// Authenticated caller extracted from a Keycloak access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Token `sub` claim (Keycloak user ID)
    pub subject: String,
    /// Principal name: `preferred_username`, falling back to `sub`
    pub username: String,
    pub email: Option<String>,
    /// Realm roles, verbatim from `realm_access.roles`
    pub roles: Vec<String>,
}

impl From<KeycloakClaims> for AuthUser {
    fn from(claims: KeycloakClaims) -> Self {
        Self {
            username: claims.principal_name().to_string(),
            roles: claims.authorities(),
            subject: claims.sub,
            email: claims.email,
        }
    }
}

impl AuthUser {
    /// Check if the caller holds a realm role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_role(&self, role: &str) -> Result<(), AuthError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!("Role {} required", role)))
        }
    }
}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Token validation failed
    InvalidToken(String),
    /// Token has expired
    TokenExpired,
    /// Valid token without the required role
    Forbidden(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message, code) = match &self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "Missing authorization token",
                "UNAUTHORIZED",
            ),
            AuthError::InvalidHeader(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header",
                "UNAUTHORIZED",
            ),
            AuthError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid token", "UNAUTHORIZED")
            }
            AuthError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "Token has expired", "UNAUTHORIZED")
            }
            AuthError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.as_str(), "FORBIDDEN"),
        };

        let body = serde_json::json!({
            "error": message,
            "code": code
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Extract the Bearer token from the Authorization header
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    let token = auth_header
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty());

    token.ok_or_else(|| {
        AuthError::InvalidHeader("Authorization header must use Bearer scheme".to_string())
    })
}

/// Verify the request's bearer token
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    verifier: &JwtVerifier,
) -> Result<AuthUser, AuthError> {
    let token = extract_bearer_token(headers)?;

    let result = match verifier.verify(token).await {
        Ok(claims) => Ok(AuthUser::from(claims)),
        Err(AppError::Jwt(e)) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            Err(AuthError::TokenExpired)
        }
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            Err(AuthError::InvalidToken(e.to_string()))
        }
    };

    let outcome = match &result {
        Ok(_) => "valid",
        Err(AuthError::TokenExpired) => "expired",
        Err(_) => "invalid",
    };
    counter!("bct_auth_token_validation_total", "result" => outcome).increment(1);

    result
}

/// Axum extractor for authenticated callers
///
/// Reuses the identity stored by the admin gate when present.
impl<S> FromRequestParts<S> for AuthUser
where
    S: HasServices + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        authenticate(&parts.headers, state.jwt_verifier()).await
    }
}
