//! Dining Table API Handlers

use axum::extract::{Path, Query, State};
use http::StatusCode;
use shared::error::{ApiResponse, AppResult};
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate, TableStatusQuery};

use crate::api::ApiJson;
use crate::core::ServerState;

/// GET /api/tables - all tables
pub async fn list(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<DiningTable>>> {
    let tables = state.tables.list_tables().await?;
    Ok(ApiResponse::success_with_message("Tables retrieved", tables))
}

/// GET /api/tables/status?status= - tables in one status
pub async fn list_by_status(
    State(state): State<ServerState>,
    Query(query): Query<TableStatusQuery>,
) -> AppResult<ApiResponse<Vec<DiningTable>>> {
    let tables = state.tables.list_by_status(&query.status).await?;
    Ok(ApiResponse::success_with_message("Tables retrieved", tables))
}

/// GET /api/tables/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<DiningTable>> {
    let table = state.tables.get_table(id).await?;
    Ok(ApiResponse::success_with_message("Table retrieved", table))
}

/// POST /api/tables
pub async fn create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<DiningTableCreate>,
) -> AppResult<(StatusCode, ApiResponse<DiningTable>)> {
    let table = state.tables.create_table(payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Table created successfully", table),
    ))
}

/// PUT /api/tables/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<DiningTableUpdate>,
) -> AppResult<ApiResponse<DiningTable>> {
    let table = state.tables.update_table(id, payload).await?;
    Ok(ApiResponse::success_with_message("Table updated successfully", table))
}

/// DELETE /api/tables/{id} - refused while reservations reference it
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    state.tables.delete_table(id).await?;
    Ok(ApiResponse::message("Table deleted successfully"))
}
