//! Principal extractor
//!
//! Validates the bearer token unless `require_auth` already did.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;

use crate::auth::{AuthenticatedPrincipal, JwtService};
use crate::core::ServerState;
use crate::security_log;

impl FromRequestParts<ServerState> for AuthenticatedPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthenticatedPrincipal>() {
            return Ok(principal.clone());
        }

        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let principal = authenticate(state, header, &parts.uri)?;

        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

/// Resolve an `Authorization` header value to a principal
pub(crate) fn authenticate(
    state: &ServerState,
    header: Option<&str>,
    uri: &http::Uri,
) -> Result<AuthenticatedPrincipal, AppError> {
    let Some(header) = header else {
        security_log!("WARN", "auth_missing", uri = uri.path());
        return Err(AppError::unauthorized());
    };

    let token = JwtService::extract_from_header(header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    state.auth.validate_token(token).map_err(|e| {
        security_log!(
            "WARN",
            "auth_failed",
            error = e.to_string(),
            uri = uri.path()
        );
        AppError::from(e)
    })
}
