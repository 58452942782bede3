//! Keycloak type definitions
//!
//! Representations exchanged with the Keycloak Admin REST API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keycloak user representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUser {
    pub id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub email_verified: bool,
    /// Creation time in epoch milliseconds
    pub created_timestamp: Option<i64>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

/// Keycloak user update input
///
/// Only the fields that are set are sent, Keycloak keeps the others untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// Input for creating a user in Keycloak
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeycloakUserInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    pub email_verified: bool,
}

/// Keycloak credential used by the reset-password endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakCredential {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub value: String,
    pub temporary: bool,
}

impl KeycloakCredential {
    pub fn password(value: impl Into<String>, temporary: bool) -> Self {
        Self {
            credential_type: "password".to_string(),
            value: value.into(),
            temporary,
        }
    }
}

/// Keycloak realm role representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakRole {
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub composite: bool,
    #[serde(default)]
    pub client_role: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// Paging and filtering for user listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub username: Option<String>,
    pub exact: bool,
    pub first: Option<u32>,
    pub max: Option<u32>,
}

impl UserQuery {
    pub fn page(first: u32, max: u32) -> Self {
        Self {
            first: Some(first),
            max: Some(max),
            ..Default::default()
        }
    }

    pub fn search(text: impl Into<String>, first: u32, max: u32) -> Self {
        Self {
            search: Some(text.into()),
            first: Some(first),
            max: Some(max),
            ..Default::default()
        }
    }

    pub fn exact_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            exact: true,
            ..Default::default()
        }
    }

    /// Query-string pairs in the form expected by `GET /users`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(username) = &self.username {
            params.push(("username", username.clone()));
        }
        if self.exact {
            params.push(("exact", "true".to_string()));
        }
        if let Some(first) = self.first {
            params.push(("first", first.to_string()));
        }
        if let Some(max) = self.max {
            params.push(("max", max.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}
