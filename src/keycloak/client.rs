//! Keycloak Admin API client
//!
//! Wraps the admin REST endpoints used for user and realm-role management.
//! Admin access tokens are cached and refreshed shortly before they expire.

use crate::config::{KeycloakAdminAuth, KeycloakConfig};
use crate::error::{AppError, Result};
use metrics::counter;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use super::types::*;

/// Seconds before expiry at which a cached admin token is considered stale
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;

/// Keycloak Admin API client
#[derive(Clone)]
pub struct KeycloakClient {
    config: KeycloakConfig,
    http_client: Client,
    token: Arc<RwLock<Option<AdminToken>>>,
}

#[derive(Debug, Clone)]
struct AdminToken {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl KeycloakClient {
    /// Create a new Keycloak client
    pub fn new(config: KeycloakConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the realm name
    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    /// Build `{url}/admin/realms/{realm}/{segments...}` with each segment percent-encoded
    fn admin_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid KEYCLOAK_URL: {}", e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::Internal(anyhow::anyhow!("KEYCLOAK_URL cannot be a base")))?;
            path.pop_if_empty()
                .extend(["admin", "realms", self.config.realm.as_str()])
                .extend(segments);
        }
        Ok(url)
    }

    /// Get admin access token (with caching)
    async fn get_admin_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(ref t) = *token {
                if t.expires_at
                    > chrono::Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS)
                {
                    return Ok(t.access_token.clone());
                }
            }
        }

        let token_url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.url.trim_end_matches('/'),
            self.config.token_realm()
        );

        let params: Vec<(&str, &str)> = match &self.config.admin_auth {
            KeycloakAdminAuth::ClientCredentials { client_secret } => vec![
                ("grant_type", "client_credentials"),
                ("client_id", &self.config.admin_client_id),
                ("client_secret", client_secret),
            ],
            KeycloakAdminAuth::Password { username, password } => vec![
                ("grant_type", "password"),
                ("client_id", &self.config.admin_client_id),
                ("username", username),
                ("password", password),
            ],
        };

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to get admin token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Keycloak(format!(
                "Failed to get admin token: {} - {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to parse token response: {}", e)))?;

        let admin_token = AdminToken {
            access_token: token_response.access_token.clone(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(token_response.expires_in),
        };

        {
            let mut token = self.token.write().await;
            *token = Some(admin_token);
        }

        Ok(token_response.access_token)
    }

    /// Send an authenticated request and map transport/status failures.
    ///
    /// 404 becomes `NotFound(not_found)`; any other non-2xx status becomes a
    /// Keycloak error carrying the status and response body.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        not_found: &str,
    ) -> Result<Response> {
        let token = self.get_admin_token().await?;

        let response = request.bearer_auth(&token).send().await.map_err(|e| {
            counter!("bct_keycloak_requests_total", "operation" => operation, "result" => "error")
                .increment(1);
            AppError::Keycloak(format!("Failed to {}: {}", operation, e))
        })?;

        let status = response.status();
        if status.is_success() {
            counter!("bct_keycloak_requests_total", "operation" => operation, "result" => "ok")
                .increment(1);
            return Ok(response);
        }

        counter!("bct_keycloak_requests_total", "operation" => operation, "result" => "error")
            .increment(1);

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(not_found.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Keycloak(format!(
            "Failed to {}: {} - {}",
            operation, status, body
        )))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to parse {} response: {}", operation, e)))
    }

    // ============================================================================
    // User Management
    // ============================================================================

    /// List or filter users
    pub async fn find_users(&self, query: &UserQuery) -> Result<Vec<KeycloakUser>> {
        let url = self.admin_url(&["users"])?;
        let request = self.http_client.get(url).query(&query.to_params());
        let response = self.send("list users", request, "Users not found").await?;
        Self::json("list users", response).await
    }

    /// List users page by page
    pub async fn list_users(&self, first: u32, max: u32) -> Result<Vec<KeycloakUser>> {
        self.find_users(&UserQuery::page(first, max)).await
    }

    /// Free-text search over username, email, first and last name
    pub async fn search_users(&self, text: &str, first: u32, max: u32) -> Result<Vec<KeycloakUser>> {
        self.find_users(&UserQuery::search(text, first, max)).await
    }

    /// Users whose username matches exactly
    pub async fn find_users_by_username_exact(&self, username: &str) -> Result<Vec<KeycloakUser>> {
        self.find_users(&UserQuery::exact_username(username)).await
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<KeycloakUser> {
        let url = self.admin_url(&["users", user_id])?;
        let response = self
            .send("get user", self.http_client.get(url), "User not found in Keycloak")
            .await?;
        Self::json("get user", response).await
    }

    /// Create a user and return its Keycloak ID
    pub async fn create_user(&self, input: &CreateKeycloakUserInput) -> Result<String> {
        let token = self.get_admin_token().await?;
        let url = self.admin_url(&["users"])?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&token)
            .json(input)
            .send()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to create user: {}", e)))?;

        if response.status() == StatusCode::CONFLICT {
            counter!("bct_keycloak_requests_total", "operation" => "create user", "result" => "conflict")
                .increment(1);
            return Err(AppError::Conflict(
                "User already exists in Keycloak".to_string(),
            ));
        }

        if response.status() != StatusCode::CREATED {
            counter!("bct_keycloak_requests_total", "operation" => "create user", "result" => "error")
                .increment(1);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Keycloak(format!(
                "Failed to create user: {} - {}",
                status, body
            )));
        }

        counter!("bct_keycloak_requests_total", "operation" => "create user", "result" => "ok")
            .increment(1);

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Keycloak("Missing location header".to_string()))?;

        user_id_from_location(location)
            .ok_or_else(|| AppError::Keycloak("Invalid location header".to_string()))
    }

    /// Update a user (partial representation)
    pub async fn update_user(&self, user_id: &str, input: &KeycloakUserUpdate) -> Result<()> {
        let url = self.admin_url(&["users", user_id])?;
        self.send(
            "update user",
            self.http_client.put(url).json(input),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }

    /// Delete a user
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let url = self.admin_url(&["users", user_id])?;
        self.send(
            "delete user",
            self.http_client.delete(url),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }

    /// Set a user's password
    pub async fn reset_user_password(
        &self,
        user_id: &str,
        password: &str,
        temporary: bool,
    ) -> Result<()> {
        let url = self.admin_url(&["users", user_id, "reset-password"])?;
        let credential = KeycloakCredential::password(password, temporary);
        self.send(
            "reset password",
            self.http_client.put(url).json(&credential),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }

    /// Email the user a link to perform the given required actions
    pub async fn execute_actions_email(&self, user_id: &str, actions: &[&str]) -> Result<()> {
        let url = self.admin_url(&["users", user_id, "execute-actions-email"])?;
        self.send(
            "send actions email",
            self.http_client.put(url).json(actions),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }

    // ============================================================================
    // Realm Roles
    // ============================================================================

    /// List all realm roles
    pub async fn list_realm_roles(&self) -> Result<Vec<KeycloakRole>> {
        let url = self.admin_url(&["roles"])?;
        let response = self
            .send("list roles", self.http_client.get(url), "Roles not found")
            .await?;
        Self::json("list roles", response).await
    }

    /// Get a realm role by name
    pub async fn get_realm_role(&self, name: &str) -> Result<KeycloakRole> {
        let url = self.admin_url(&["roles", name])?;
        let response = self
            .send(
                "get role",
                self.http_client.get(url),
                &format!("Role '{}' not found", name),
            )
            .await?;
        Self::json("get role", response).await
    }

    /// Users holding a realm role (direct mappings)
    pub async fn list_role_members(&self, name: &str) -> Result<Vec<KeycloakUser>> {
        let url = self.admin_url(&["roles", name, "users"])?;
        let response = self
            .send(
                "list role members",
                self.http_client.get(url),
                &format!("Role '{}' not found", name),
            )
            .await?;
        Self::json("list role members", response).await
    }

    /// Effective realm roles of a user, composites expanded
    pub async fn list_effective_user_realm_roles(&self, user_id: &str) -> Result<Vec<KeycloakRole>> {
        let url = self.admin_url(&["users", user_id, "role-mappings", "realm", "composite"])?;
        let response = self
            .send(
                "list user roles",
                self.http_client.get(url),
                "User not found in Keycloak",
            )
            .await?;
        Self::json("list user roles", response).await
    }

    /// Add realm role mappings to a user
    pub async fn add_user_realm_roles(&self, user_id: &str, roles: &[KeycloakRole]) -> Result<()> {
        let url = self.admin_url(&["users", user_id, "role-mappings", "realm"])?;
        self.send(
            "assign roles",
            self.http_client.post(url).json(roles),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }

    /// Remove realm role mappings from a user
    pub async fn remove_user_realm_roles(
        &self,
        user_id: &str,
        roles: &[KeycloakRole],
    ) -> Result<()> {
        let url = self.admin_url(&["users", user_id, "role-mappings", "realm"])?;
        self.send(
            "remove roles",
            self.http_client.delete(url).json(roles),
            "User not found in Keycloak",
        )
        .await?;
        Ok(())
    }
}

/// Last path segment of a `Location` header
fn user_id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .split('/')
        .next_back()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
