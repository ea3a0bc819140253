//! User API Handlers

use axum::extract::{Path, State};
use shared::error::{ApiResponse, AppResult};
use shared::models::{UserResponse, UserUpdate};

use crate::api::ApiJson;
use crate::auth::AuthenticatedPrincipal;
use crate::core::ServerState;

/// GET /api/users - all accounts
pub async fn list(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.users.list_users().await?;
    Ok(ApiResponse::success_with_message("Users retrieved", users))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.users.get_user(&principal, id).await?;
    Ok(ApiResponse::success_with_message("User retrieved", user))
}

/// PUT /api/users/{id}
pub async fn update(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.users.update_user(&principal, id, payload).await?;
    Ok(ApiResponse::success_with_message("User updated successfully", user))
}

/// DELETE /api/users/{id}
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    state.users.delete_user(id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
