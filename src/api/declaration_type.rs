//! Declaration type API handlers

use crate::api::MessageResponse;
use crate::domain::{DeclarationType, DeclarationTypeInput};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

#[utoipa::path(
    get,
    path = "/api/admin/declaration-types",
    tag = "Declaration Types",
    responses(
        (status = 200, description = "All declaration types", body = [DeclarationType])
    )
)]
/// List declaration types
pub async fn list<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let declarations = state.declaration_type_service().list().await?;
    Ok(Json(declarations))
}

#[utoipa::path(
    post,
    path = "/api/admin/declaration-types",
    tag = "Declaration Types",
    request_body = DeclarationTypeInput,
    responses(
        (status = 201, description = "Created", body = DeclarationType),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Code already used")
    )
)]
/// Create a declaration type
pub async fn create<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<DeclarationTypeInput>,
) -> Result<impl IntoResponse> {
    let created = state.declaration_type_service().create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/admin/declaration-types/{id}",
    tag = "Declaration Types",
    request_body = DeclarationTypeInput,
    responses(
        (status = 200, description = "Updated", body = DeclarationType),
        (status = 404, description = "Not found"),
        (status = 409, description = "Code already used")
    )
)]
/// Replace a declaration type
pub async fn update<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
    Json(input): Json<DeclarationTypeInput>,
) -> Result<impl IntoResponse> {
    let updated = state.declaration_type_service().update(id, input).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/admin/declaration-types/{id}",
    tag = "Declaration Types",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
/// Delete a declaration type
pub async fn delete<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.declaration_type_service().delete(id).await?;
    Ok(Json(MessageResponse::new(
        "Declaration type deleted successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/declaration-types/{id}/toggle",
    tag = "Declaration Types",
    responses(
        (status = 200, description = "Active flag flipped", body = DeclarationType),
        (status = 404, description = "Not found")
    )
)]
/// Flip the active flag
pub async fn toggle<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let toggled = state.declaration_type_service().toggle(id).await?;
    Ok(Json(toggled))
}
