//! Reservation API Handlers

use axum::extract::{Path, State};
use http::StatusCode;
use shared::error::{ApiResponse, AppResult};
use shared::models::{Reservation, ReservationCreate, ReservationDetail, ReservationUpdate};

use crate::api::ApiJson;
use crate::auth::AuthenticatedPrincipal;
use crate::core::ServerState;

/// GET /api/reservation - every reservation, possibly empty
pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<ApiResponse<Vec<ReservationDetail>>> {
    let reservations = state.reservations.get_all_reservations().await?;
    Ok(ApiResponse::success_with_message("Reservations retrieved", reservations))
}

/// GET /api/reservation/my-reservation - the caller's reservations
pub async fn mine(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
) -> AppResult<ApiResponse<Vec<ReservationDetail>>> {
    let reservations = state
        .reservations
        .get_reservations_by_user(principal.id)
        .await?;
    Ok(ApiResponse::success_with_message("Reservations retrieved", reservations))
}

/// POST /api/reservation
pub async fn create(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    ApiJson(payload): ApiJson<ReservationCreate>,
) -> AppResult<(StatusCode, ApiResponse<Reservation>)> {
    let reservation = state
        .reservations
        .create_reservation(&principal, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Reservation created successfully", reservation),
    ))
}

/// GET /api/reservation/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<ReservationDetail>> {
    let detail = state
        .reservations
        .get_reservation_detail(&principal, id)
        .await?;
    Ok(ApiResponse::success_with_message("Reservation retrieved", detail))
}

/// PUT /api/reservation/{id}
pub async fn update(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<ReservationUpdate>,
) -> AppResult<ApiResponse<Reservation>> {
    let reservation = state
        .reservations
        .update_reservation(&principal, id, payload)
        .await?;
    Ok(ApiResponse::success_with_message("Reservation updated successfully", reservation))
}

/// DELETE /api/reservation/{id} - cancels and frees the table
pub async fn delete(
    State(state): State<ServerState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    let removed = state
        .reservations
        .delete_reservation(&principal, id)
        .await?;
    Ok(ApiResponse::success_with_message("Reservation deleted successfully", removed))
}
