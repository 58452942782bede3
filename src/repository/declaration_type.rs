//! Declaration type repository

use crate::domain::{DeclarationType, DeclarationTypeInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeclarationTypeRepository: Send + Sync {
    async fn create(&self, input: &DeclarationTypeInput) -> Result<DeclarationType>;
    async fn find_by_id(&self, id: i64) -> Result<Option<DeclarationType>>;
    async fn find_by_code(&self, code: &str) -> Result<Option<DeclarationType>>;
    async fn list(&self) -> Result<Vec<DeclarationType>>;
    async fn update(&self, id: i64, input: &DeclarationTypeInput) -> Result<DeclarationType>;
    async fn set_active(&self, id: i64, actif: bool) -> Result<DeclarationType>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// A concurrent writer can take the code between the service's lookup and the write;
/// the unique index then rejects it.
fn conflict_on_duplicate_code(error: sqlx::Error, code: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!(
                "Declaration type with code '{}' already exists",
                code
            ));
        }
    }
    AppError::Database(error)
}

pub struct DeclarationTypeRepositoryImpl {
    pool: MySqlPool,
}

impl DeclarationTypeRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeclarationTypeRepository for DeclarationTypeRepositoryImpl {
    async fn create(&self, input: &DeclarationTypeInput) -> Result<DeclarationType> {
        let result = sqlx::query(
            r#"
            INSERT INTO declaration_types (code, nom, format, frequence, date_limite, actif)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.code)
        .bind(&input.nom)
        .bind(input.format)
        .bind(input.frequence)
        .bind(input.date_limite)
        .bind(input.actif)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate_code(e, &input.code))?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Failed to create declaration type"))
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<DeclarationType>> {
        let declaration = sqlx::query_as::<_, DeclarationType>(
            r#"
            SELECT id, code, nom, format, frequence, date_limite, actif
            FROM declaration_types
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(declaration)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DeclarationType>> {
        let declaration = sqlx::query_as::<_, DeclarationType>(
            r#"
            SELECT id, code, nom, format, frequence, date_limite, actif
            FROM declaration_types
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(declaration)
    }

    async fn list(&self) -> Result<Vec<DeclarationType>> {
        let declarations = sqlx::query_as::<_, DeclarationType>(
            r#"
            SELECT id, code, nom, format, frequence, date_limite, actif
            FROM declaration_types
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(declarations)
    }

    async fn update(&self, id: i64, input: &DeclarationTypeInput) -> Result<DeclarationType> {
        // MySQL reports 0 affected rows for no-op updates, so existence is checked by re-reading
        sqlx::query(
            r#"
            UPDATE declaration_types
            SET code = ?, nom = ?, format = ?, frequence = ?, date_limite = ?, actif = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.code)
        .bind(&input.nom)
        .bind(input.format)
        .bind(input.frequence)
        .bind(input.date_limite)
        .bind(input.actif)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate_code(e, &input.code))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Declaration type not found".to_string()))
    }

    async fn set_active(&self, id: i64, actif: bool) -> Result<DeclarationType> {
        sqlx::query("UPDATE declaration_types SET actif = ? WHERE id = ?")
            .bind(actif)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Declaration type not found".to_string()))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM declaration_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Declaration type not found".to_string()));
        }

        Ok(())
    }
}
