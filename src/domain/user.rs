//! User and role models exposed by the admin API and mirrored locally

use crate::keycloak::{KeycloakRole, KeycloakUser};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").unwrap();
}

/// Loose email shape check: a local part of `[A-Za-z0-9+_.-]` then `@` and anything
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// User as returned by the admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub email_verified: bool,
    /// Creation time in epoch milliseconds
    pub created_timestamp: Option<i64>,
    pub roles: Vec<String>,
}

impl UserDto {
    pub fn from_keycloak(user: KeycloakUser, roles: Vec<String>) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            enabled: user.enabled,
            email_verified: user.email_verified,
            created_timestamp: user.created_timestamp,
            roles,
        }
    }
}

/// Realm role as returned by the admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleDto {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

impl From<KeycloakRole> for RoleDto {
    fn from(role: KeycloakRole) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
        }
    }
}

/// Request body for `POST /api/admin/users`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl CreateUserRequest {
    /// Trim all text fields and lower-case the email
    pub fn normalized(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        Self {
            username: trim(self.username),
            email: self.email.map(|e| e.trim().to_lowercase()),
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            ..self
        }
    }

    /// Shape checks that need no identity-provider lookup
    pub fn local_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.username.as_deref().is_none_or(str::is_empty) {
            errors.push("Username is required".to_string());
        }

        match self.email.as_deref() {
            None | Some("") => errors.push("Email is required".to_string()),
            Some(email) if !is_valid_email(email) => {
                errors.push("Invalid email format".to_string())
            }
            Some(_) => {}
        }

        errors
    }
}

/// Request body for `PUT /api/admin/users/{id}`
///
/// Accepts the same shape as [`UserDto`]; only the editable fields are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// Response body for a created user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user_id: String,
    pub message: String,
}

/// Local mirror of an identity-provider user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub keycloak_id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub email_verified: bool,
    pub roles: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// `users` table row; roles live in `user_roles`
#[derive(Debug, Clone, FromRow)]
pub struct LocalUserRow {
    pub keycloak_id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUserRow {
    pub fn with_roles(self, roles: Vec<String>) -> LocalUser {
        LocalUser {
            keycloak_id: self.keycloak_id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            enabled: self.enabled,
            email_verified: self.email_verified,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Values written to the mirror by a sync
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertLocalUserInput {
    pub keycloak_id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub email_verified: bool,
    pub roles: Vec<String>,
    /// Only applied when the row has no creation time yet
    pub created_at: Option<DateTime<Utc>>,
}

impl UpsertLocalUserInput {
    pub fn from_keycloak(keycloak_id: &str, user: KeycloakUser, roles: Vec<String>) -> Self {
        Self {
            keycloak_id: user.id.unwrap_or_else(|| keycloak_id.to_string()),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            enabled: user.enabled,
            email_verified: user.email_verified,
            roles,
            created_at: user
                .created_timestamp
                .and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

/// Outcome of a full mirror resync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
}
