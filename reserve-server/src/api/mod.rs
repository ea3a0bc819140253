//! HTTP API
//!
//! # Structure
//!
//! - [`auth`] - registration and login (public)
//! - [`users`] - account management
//! - [`tables`] - dining tables
//! - [`reservations`] - bookings
//! - [`health`] - liveness and store check (public)
//!
//! Every protected group sits behind [`require_auth`]; admin-only routes add
//! [`require_admin`](crate::auth::require_admin) on top.

pub mod auth;
pub mod health;
pub mod reservations;
pub mod tables;
pub mod users;

use axum::{
    Json, Router,
    extract::{FromRequest, Request},
    middleware,
};
use http::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use shared::error::AppError;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::require_auth;
use crate::core::ServerState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON body whose rejections use the error envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no global middleware, no state
pub fn build_router(state: &ServerState) -> Router<ServerState> {
    let protected = Router::new()
        .merge(users::router())
        .merge(tables::router())
        .merge(reservations::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(auth::router())
        .merge(health::router())
        .merge(protected)
}

/// Router with CORS, tracing and request ids; used by the server and tests
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
}
