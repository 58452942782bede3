//! Declaration type business logic

use crate::domain::{DeclarationType, DeclarationTypeInput};
use crate::error::{AppError, Result};
use crate::repository::DeclarationTypeRepository;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct DeclarationTypeService<R: DeclarationTypeRepository> {
    repo: Arc<R>,
}

impl<R: DeclarationTypeRepository> DeclarationTypeService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: DeclarationTypeInput) -> Result<DeclarationType> {
        let input = input.normalized();
        input.validate()?;

        if self.repo.find_by_code(&input.code).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Declaration type with code '{}' already exists",
                input.code
            )));
        }

        let created = self.repo.create(&input).await?;
        info!(id = created.id, code = %created.code, "created declaration type");
        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<DeclarationType>> {
        self.repo.list().await
    }

    pub async fn get(&self, id: i64) -> Result<DeclarationType> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Declaration type {} not found", id)))
    }

    pub async fn update(&self, id: i64, input: DeclarationTypeInput) -> Result<DeclarationType> {
        let input = input.normalized();
        input.validate()?;

        self.get(id).await?;

        if let Some(existing) = self.repo.find_by_code(&input.code).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!(
                    "Declaration type with code '{}' already exists",
                    input.code
                )));
            }
        }

        let updated = self.repo.update(id, &input).await?;
        info!(id, code = %updated.code, "updated declaration type");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.repo.delete(id).await?;
        info!(id, "deleted declaration type");
        Ok(())
    }

    /// Flip the active flag
    pub async fn toggle(&self, id: i64) -> Result<DeclarationType> {
        let current = self.get(id).await?;
        self.repo.set_active(id, !current.actif).await
    }
}
