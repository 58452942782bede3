//! User administration API handlers

use crate::api::{MessageResponse, PageQuery};
use crate::domain::{
    CreateUserRequest, CreateUserResponse, LocalUser, SyncReport, UpdateUserRequest, UserDto,
};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free text matched against username, email and names
    pub query: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LocalUserQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_local_limit")]
    pub limit: i64,
}

fn default_local_limit() -> i64 {
    1000
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    params(PageQuery),
    responses(
        (status = 200, description = "Users with their application roles", body = [UserDto])
    )
)]
/// List users
pub async fn list_users<S: HasServices>(
    State(state): State<S>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let users = state
        .admin_user_service()
        .list_users(page.first, page.max)
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/search",
    tag = "Users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching users", body = [UserDto]),
        (status = 400, description = "Missing query parameter")
    )
)]
/// Search users by free text
pub async fn search_users<S: HasServices>(
    State(state): State<S>,
    Query(search): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let users = state.admin_user_service().search_users(&search.query).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Users",
    responses(
        (status = 200, description = "User", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
/// Get user by Keycloak ID
pub async fn get_user<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state.admin_user_service().get_user(&id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Validation failed")
    )
)]
/// Create user
pub async fn create_user<S: HasServices>(
    State(state): State<S>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    let user_id = state.admin_user_service().create_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user_id,
            message: "User created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
/// Update user profile and enabled flag
pub async fn update_user<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    state.admin_user_service().update_user(&id, request).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Users",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
/// Delete user
pub async fn delete_user<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.admin_user_service().delete_user(&id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/status",
    tag = "Users",
    params(StatusQuery),
    responses(
        (status = 200, description = "Status updated", body = MessageResponse)
    )
)]
/// Enable or disable a user
pub async fn update_status<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
    Query(status): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    state
        .admin_user_service()
        .toggle_user_status(&id, status.enabled)
        .await?;
    Ok(Json(MessageResponse::new("User status updated successfully")))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/reset-password",
    tag = "Users",
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse)
    )
)]
/// Email the user an update-password action
pub async fn reset_password<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .admin_user_service()
        .send_password_reset_email(&id)
        .await?;
    Ok(Json(MessageResponse::new(
        "Password reset email sent successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/local-users",
    tag = "Local Mirror",
    params(LocalUserQuery),
    responses(
        (status = 200, description = "Mirrored users", body = [LocalUser])
    )
)]
/// List mirrored users
pub async fn list_local_users<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<LocalUserQuery>,
) -> Result<impl IntoResponse> {
    let (users, _total) = state
        .admin_user_service()
        .local_users(query.offset.max(0), query.limit.max(1))
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/local-users/{keycloak_id}",
    tag = "Local Mirror",
    responses(
        (status = 200, description = "Mirrored user", body = LocalUser),
        (status = 404, description = "Not mirrored")
    )
)]
/// Get a mirrored user
pub async fn get_local_user<S: HasServices>(
    State(state): State<S>,
    Path(keycloak_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state.admin_user_service().local_user(&keycloak_id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/sync",
    tag = "Local Mirror",
    responses(
        (status = 200, description = "Resync finished", body = SyncReport)
    )
)]
/// Mirror every Keycloak user
pub async fn sync_users<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let report = state.admin_user_service().sync_all_users().await?;
    Ok(Json(report))
}
