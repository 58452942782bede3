//! Realm role API handlers

use crate::api::MessageResponse;
use crate::domain::{RoleDto, UserDto};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

#[utoipa::path(
    get,
    path = "/api/admin/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "Application realm roles", body = [RoleDto])
    )
)]
/// List application roles
pub async fn list_roles<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let roles = state.admin_user_service().list_roles().await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "Effective application roles", body = [RoleDto])
    )
)]
/// Effective application roles of a user
pub async fn get_user_roles<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let roles = state.admin_user_service().get_user_roles(&id).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/roles",
    tag = "Roles",
    request_body = Vec<String>,
    responses(
        (status = 200, description = "Roles assigned", body = MessageResponse)
    )
)]
/// Assign realm roles by name
pub async fn assign_roles<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
    Json(names): Json<Vec<String>>,
) -> Result<impl IntoResponse> {
    state.admin_user_service().assign_roles(&id, &names).await?;
    Ok(Json(MessageResponse::new("Roles assigned successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}/roles",
    tag = "Roles",
    request_body = Vec<String>,
    responses(
        (status = 200, description = "Roles removed", body = MessageResponse)
    )
)]
/// Remove realm roles by name
pub async fn remove_roles<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
    Json(names): Json<Vec<String>>,
) -> Result<impl IntoResponse> {
    state.admin_user_service().remove_roles(&id, &names).await?;
    Ok(Json(MessageResponse::new("Roles removed successfully")))
}

#[utoipa::path(
    get,
    path = "/api/admin/roles/{name}/users",
    tag = "Roles",
    responses(
        (status = 200, description = "Direct members of the role", body = [UserDto]),
        (status = 404, description = "Role not found")
    )
)]
/// Users holding a role
pub async fn users_by_role<S: HasServices>(
    State(state): State<S>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let users = state.admin_user_service().users_by_role(&name).await?;
    Ok(Json(users))
}
