//! Authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};

use crate::auth::AuthenticatedPrincipal;
use crate::auth::extractor::authenticate;
use crate::core::ServerState;
use crate::security_log;

/// Require a valid bearer token
///
/// Injects [`AuthenticatedPrincipal`] into the request extensions.
///
/// | Failure | Status |
/// |---------|--------|
/// | no Authorization header | 401 NotAuthenticated |
/// | expired token | 401 TokenExpired |
/// | malformed or forged token | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let principal = authenticate(&state, header, req.uri())?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Require the admin role; must run inside [`require_auth`]
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<AuthenticatedPrincipal>()
        .ok_or_else(AppError::unauthorized)?;

    if !principal.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = principal.id,
            role = principal.role.as_str(),
            uri = req.uri().path()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}
