//! Middleware for JWT token validation and the admin guard

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppState, error::ApiError, models::Role};

pub const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// Extract and validate the access token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
        debug!("Rejected access token: {}", e);
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

/// Only let requests through that carry the configured admin token.
///
/// With no token configured the admin surface does not exist.
pub async fn admin_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::NotFound("Not found".to_string()));
    };

    let provided = req
        .headers()
        .get(&ADMIN_TOKEN_HEADER)
        .and_then(|header| header.to_str().ok());

    if !admin_token_matches(provided, expected) {
        warn!("Rejected admin request to {}", req.uri().path());
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// Compare tokens in time independent of where they first differ
fn admin_token_matches(provided: Option<&str>, expected: &str) -> bool {
    provided.is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_matches() {
        assert!(admin_token_matches(Some("admin-secret"), "admin-secret"));
        assert!(!admin_token_matches(Some("admin-secreT"), "admin-secret"));
        assert!(!admin_token_matches(Some("admin"), "admin-secret"));
        assert!(!admin_token_matches(Some(""), "admin-secret"));
        assert!(!admin_token_matches(None, "admin-secret"));
    }
}
