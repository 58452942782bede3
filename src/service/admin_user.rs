//! User and realm-role administration
//!
//! Every identity operation is delegated to Keycloak. Changes are then
//! mirrored into the local `users` table.

use crate::domain::{
    CreateUserRequest, LocalUser, RoleDto, SyncReport, UpdateUserRequest, UpsertLocalUserInput,
    UserDto,
};
use crate::error::{AppError, Result};
use crate::keycloak::{CreateKeycloakUserInput, KeycloakClient, KeycloakRole, KeycloakUserUpdate};
use crate::repository::UserRepository;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Page size used for searches and full resyncs
const SEARCH_PAGE_SIZE: u32 = 100;
/// Number of search hits inspected for an email collision
const EMAIL_CHECK_LIMIT: u32 = 10;
/// Required action sent by the password reset email
const UPDATE_PASSWORD_ACTION: &str = "UPDATE_PASSWORD";

pub struct AdminUserService<R: UserRepository> {
    repo: Arc<R>,
    keycloak: KeycloakClient,
    role_prefix: String,
}

impl<R: UserRepository> AdminUserService<R> {
    pub fn new(repo: Arc<R>, keycloak: KeycloakClient, role_prefix: impl Into<String>) -> Self {
        Self {
            repo,
            keycloak,
            role_prefix: role_prefix.into(),
        }
    }

    fn is_app_role(&self, name: &str) -> bool {
        name.starts_with(&self.role_prefix)
    }

    /// Effective application roles of a user
    async fn app_roles(&self, user_id: &str) -> Result<Vec<KeycloakRole>> {
        let roles = self.keycloak.list_effective_user_realm_roles(user_id).await?;
        Ok(roles
            .into_iter()
            .filter(|role| self.is_app_role(&role.name))
            .collect())
    }

    async fn app_role_names_or_empty(&self, user_id: &str) -> Vec<String> {
        match self.app_roles(user_id).await {
            Ok(roles) => roles.into_iter().map(|role| role.name).collect(),
            Err(e) => {
                warn!(user_id, error = %e, "could not load roles, returning user without roles");
                Vec::new()
            }
        }
    }

    async fn to_dtos(&self, users: Vec<crate::keycloak::KeycloakUser>) -> Vec<UserDto> {
        let mut dtos = Vec::with_capacity(users.len());
        for user in users {
            let roles = match user.id.as_deref() {
                Some(id) => self.app_role_names_or_empty(id).await,
                None => Vec::new(),
            };
            dtos.push(UserDto::from_keycloak(user, roles));
        }
        dtos
    }

    // ==================== Users ====================

    pub async fn list_users(&self, first: u32, max: u32) -> Result<Vec<UserDto>> {
        let users = self.keycloak.list_users(first, max).await?;
        Ok(self.to_dtos(users).await)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserDto> {
        let user = self.keycloak.get_user(user_id).await?;
        let roles = self.app_role_names_or_empty(user_id).await;
        Ok(UserDto::from_keycloak(user, roles))
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<UserDto>> {
        let users = self
            .keycloak
            .search_users(query, 0, SEARCH_PAGE_SIZE)
            .await?;
        Ok(self.to_dtos(users).await)
    }

    /// Validate the request against local rules and existing Keycloak users.
    ///
    /// Lookups that fail are logged and treated as "no collision".
    async fn validate_new_user(&self, request: &CreateUserRequest) -> Result<()> {
        let mut errors = request.local_errors();

        if let Some(username) = request.username.as_deref().filter(|u| !u.is_empty()) {
            match self.keycloak.find_users_by_username_exact(username).await {
                Ok(existing) if !existing.is_empty() => {
                    errors.push("Username already exists".to_string())
                }
                Ok(_) => {}
                Err(e) => warn!(username, error = %e, "could not check username uniqueness"),
            }
        }

        if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
            match self.keycloak.search_users(email, 0, EMAIL_CHECK_LIMIT).await {
                Ok(found) => {
                    let taken = found.iter().any(|u| {
                        u.email
                            .as_deref()
                            .is_some_and(|existing| existing.eq_ignore_ascii_case(email))
                    });
                    if taken {
                        errors.push("Email already exists".to_string());
                    }
                }
                Err(e) => warn!(email, error = %e, "could not check email uniqueness"),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Validation failed: {}",
                errors.join(", ")
            )))
        }
    }

    /// Create a user and return its Keycloak ID.
    ///
    /// Password, role assignment and mirroring happen after creation; their
    /// failures are logged and do not fail the request.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<String> {
        let request = request.normalized();
        self.validate_new_user(&request).await?;

        let input = CreateKeycloakUserInput {
            username: request.username.clone().unwrap_or_default(),
            email: request.email.clone().unwrap_or_default(),
            first_name: request.first_name.clone().unwrap_or_default(),
            last_name: request.last_name.clone().unwrap_or_default(),
            enabled: request.enabled,
            email_verified: true,
        };

        let user_id = self.keycloak.create_user(&input).await?;
        info!(user_id, username = %input.username, "created user in Keycloak");

        if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
            if let Err(e) = self
                .keycloak
                .reset_user_password(&user_id, password, false)
                .await
            {
                error!(user_id, error = %e, "failed to set initial password");
            }
        }

        if !request.roles.is_empty() {
            if let Err(e) = self.apply_role_change(&user_id, &request.roles, true).await {
                error!(user_id, error = %e, "failed to assign initial roles");
            }
        }

        if let Err(e) = self.sync_user(&user_id).await {
            error!(user_id, error = %e, "failed to mirror new user");
        }

        Ok(user_id)
    }

    pub async fn update_user(&self, user_id: &str, request: UpdateUserRequest) -> Result<()> {
        // Surface a missing user as 404 before writing
        self.keycloak.get_user(user_id).await?;

        let update = KeycloakUserUpdate {
            email: request.email.map(|e| e.trim().to_lowercase()),
            first_name: request.first_name,
            last_name: request.last_name,
            enabled: Some(request.enabled),
            email_verified: None,
        };
        self.keycloak.update_user(user_id, &update).await?;
        info!(user_id, "updated user in Keycloak");

        self.sync_user(user_id).await?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        if self.repo.exists_by_keycloak_id(user_id).await? {
            self.repo.delete(user_id).await?;
            debug!(user_id, "deleted mirrored user");
        }

        self.keycloak.delete_user(user_id).await?;
        info!(user_id, "deleted user from Keycloak");
        Ok(())
    }

    pub async fn toggle_user_status(&self, user_id: &str, enabled: bool) -> Result<()> {
        let update = KeycloakUserUpdate {
            enabled: Some(enabled),
            ..Default::default()
        };
        self.keycloak.update_user(user_id, &update).await?;
        info!(user_id, enabled, "updated user status");

        self.sync_user(user_id).await?;
        Ok(())
    }

    pub async fn send_password_reset_email(&self, user_id: &str) -> Result<()> {
        self.keycloak
            .execute_actions_email(user_id, &[UPDATE_PASSWORD_ACTION])
            .await?;
        info!(user_id, "sent password reset email");
        Ok(())
    }

    // ==================== Roles ====================

    /// Realm roles carrying the application prefix
    pub async fn list_roles(&self) -> Result<Vec<RoleDto>> {
        let roles = self.keycloak.list_realm_roles().await?;
        Ok(roles
            .into_iter()
            .filter(|role| self.is_app_role(&role.name))
            .map(RoleDto::from)
            .collect())
    }

    pub async fn get_user_roles(&self, user_id: &str) -> Result<Vec<RoleDto>> {
        let roles = self.app_roles(user_id).await?;
        Ok(roles.into_iter().map(RoleDto::from).collect())
    }

    /// Resolve role names; unknown names are logged and skipped
    async fn resolve_roles(&self, names: &[String]) -> Result<Vec<KeycloakRole>> {
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            match self.keycloak.get_realm_role(name).await {
                Ok(role) => roles.push(role),
                Err(AppError::NotFound(_)) => warn!(role = %name, "role not found, skipping"),
                Err(e) => return Err(e),
            }
        }
        Ok(roles)
    }

    async fn apply_role_change(&self, user_id: &str, names: &[String], add: bool) -> Result<()> {
        let roles = self.resolve_roles(names).await?;
        if roles.is_empty() {
            return Ok(());
        }

        if add {
            self.keycloak.add_user_realm_roles(user_id, &roles).await?;
        } else {
            self.keycloak.remove_user_realm_roles(user_id, &roles).await?;
        }
        info!(user_id, count = roles.len(), add, "changed realm role mappings");
        Ok(())
    }

    pub async fn assign_roles(&self, user_id: &str, names: &[String]) -> Result<()> {
        self.apply_role_change(user_id, names, true).await?;
        self.sync_user(user_id).await?;
        Ok(())
    }

    pub async fn remove_roles(&self, user_id: &str, names: &[String]) -> Result<()> {
        self.apply_role_change(user_id, names, false).await?;
        self.sync_user(user_id).await?;
        Ok(())
    }

    pub async fn users_by_role(&self, role_name: &str) -> Result<Vec<UserDto>> {
        let users = self.keycloak.list_role_members(role_name).await?;
        Ok(self.to_dtos(users).await)
    }

    // ==================== Local mirror ====================

    pub async fn local_user(&self, keycloak_id: &str) -> Result<LocalUser> {
        self.repo
            .find_by_keycloak_id(keycloak_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Local user {} not found", keycloak_id)))
    }

    pub async fn local_users(&self, offset: i64, limit: i64) -> Result<(Vec<LocalUser>, i64)> {
        let users = self.repo.list(offset, limit).await?;
        let total = self.repo.count().await?;
        Ok((users, total))
    }

    /// Copy a Keycloak user and its application roles into the mirror
    pub async fn sync_user(&self, user_id: &str) -> Result<LocalUser> {
        let mirrored = async {
            let user = self.keycloak.get_user(user_id).await?;
            let roles = self
                .app_roles(user_id)
                .await?
                .into_iter()
                .map(|role| role.name)
                .collect();
            let input = UpsertLocalUserInput::from_keycloak(user_id, user, roles);
            self.repo.upsert(&input).await
        }
        .await;

        match mirrored {
            Ok(local) => {
                debug!(user_id, username = %local.username, "mirrored user");
                Ok(local)
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to mirror user");
                Err(AppError::Internal(anyhow::anyhow!(
                    "Failed to sync user to database: {}",
                    e
                )))
            }
        }
    }

    /// Mirror every Keycloak user; individual failures are counted, not fatal
    pub async fn sync_all_users(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut first = 0;

        loop {
            let page = self.keycloak.list_users(first, SEARCH_PAGE_SIZE).await?;
            let page_len = page.len() as u32;

            for user in page {
                report.total += 1;
                let Some(id) = user.id else {
                    report.failed += 1;
                    continue;
                };
                match self.sync_user(&id).await {
                    Ok(_) => report.synced += 1,
                    Err(_) => report.failed += 1,
                }
            }

            if page_len < SEARCH_PAGE_SIZE {
                break;
            }
            first += SEARCH_PAGE_SIZE;
        }

        info!(
            total = report.total,
            synced = report.synced,
            failed = report.failed,
            "user mirror resync finished"
        );
        Ok(report)
    }
}
