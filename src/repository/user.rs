//! Local user mirror repository

use crate::domain::{LocalUser, LocalUserRow, UpsertLocalUserInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<LocalUser>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<LocalUser>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>>;
    async fn exists_by_keycloak_id(&self, keycloak_id: &str) -> Result<bool>;
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<LocalUser>>;
    async fn count(&self) -> Result<i64>;
    /// Insert or refresh a mirrored user and replace its role set
    async fn upsert(&self, input: &UpsertLocalUserInput) -> Result<LocalUser>;
    async fn delete(&self, keycloak_id: &str) -> Result<()>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn roles_of(&self, keycloak_id: &str) -> Result<Vec<String>> {
        let roles: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT role FROM user_roles
            WHERE user_keycloak_id = ?
            ORDER BY role
            "#,
        )
        .bind(keycloak_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles.into_iter().map(|(role,)| role).collect())
    }

    async fn attach_roles(&self, row: Option<LocalUserRow>) -> Result<Option<LocalUser>> {
        match row {
            Some(row) => {
                let roles = self.roles_of(&row.keycloak_id).await?;
                Ok(Some(row.with_roles(roles)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<LocalUser>> {
        let row = sqlx::query_as::<_, LocalUserRow>(
            r#"
            SELECT keycloak_id, username, email, first_name, last_name, enabled, email_verified, created_at, updated_at
            FROM users
            WHERE keycloak_id = ?
            "#,
        )
        .bind(keycloak_id)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<LocalUser>> {
        let row = sqlx::query_as::<_, LocalUserRow>(
            r#"
            SELECT keycloak_id, username, email, first_name, last_name, enabled, email_verified, created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>> {
        let row = sqlx::query_as::<_, LocalUserRow>(
            r#"
            SELECT keycloak_id, username, email, first_name, last_name, enabled, email_verified, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn exists_by_keycloak_id(&self, keycloak_id: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE keycloak_id = ?")
            .bind(keycloak_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<LocalUser>> {
        let rows = sqlx::query_as::<_, LocalUserRow>(
            r#"
            SELECT keycloak_id, username, email, first_name, last_name, enabled, email_verified, created_at, updated_at
            FROM users
            ORDER BY username
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let roles = self.roles_of(&row.keycloak_id).await?;
            users.push(row.with_roles(roles));
        }
        Ok(users)
    }

    async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn upsert(&self, input: &UpsertLocalUserInput) -> Result<LocalUser> {
        let mut tx = self.pool.begin().await?;

        // created_at keeps its first non-null value
        sqlx::query(
            r#"
            INSERT INTO users (keycloak_id, username, email, first_name, last_name, enabled, email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NOW())
            ON DUPLICATE KEY UPDATE
                username = VALUES(username),
                email = VALUES(email),
                first_name = VALUES(first_name),
                last_name = VALUES(last_name),
                enabled = VALUES(enabled),
                email_verified = VALUES(email_verified),
                created_at = COALESCE(created_at, VALUES(created_at)),
                updated_at = NOW()
            "#,
        )
        .bind(&input.keycloak_id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.enabled)
        .bind(input.email_verified)
        .bind(input.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_roles WHERE user_keycloak_id = ?")
            .bind(&input.keycloak_id)
            .execute(&mut *tx)
            .await?;

        for role in &input.roles {
            sqlx::query("INSERT IGNORE INTO user_roles (user_keycloak_id, role) VALUES (?, ?)")
                .bind(&input.keycloak_id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_by_keycloak_id(&input.keycloak_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to upsert user")))
    }

    async fn delete(&self, keycloak_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE keycloak_id = ?")
            .bind(keycloak_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Local user {} not found",
                keycloak_id
            )));
        }

        Ok(())
    }
}
