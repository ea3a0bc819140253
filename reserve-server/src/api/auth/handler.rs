//! Auth API Handlers

use axum::extract::State;
use http::StatusCode;
use shared::error::{ApiResponse, AppResult};
use shared::models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};

use crate::api::ApiJson;
use crate::core::ServerState;

/// POST /api/register - create a customer account
pub async fn register(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, ApiResponse<UserResponse>)> {
    let user = state.users.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("User registered successfully", user),
    ))
}

/// POST /api/login - exchange credentials for a bearer token
pub async fn login(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let login = state.users.login(payload).await?;
    Ok(ApiResponse::success_with_message("Login successful", login))
}
