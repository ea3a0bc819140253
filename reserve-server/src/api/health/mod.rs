//! Health check (public)
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "store": "ok", "booking_policy": "exact_slot" }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use http::StatusCode;
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    /// ok | error
    store: &'static str,
    booking_policy: &'static str,
}

/// GET /health - 503 when the store does not answer
pub async fn health(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store ping failed");
            false
        }
    };

    let (code, status, store) = if store_ok {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "error")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store,
            booking_policy: state.reservations.policy().as_str(),
        }),
    )
}
