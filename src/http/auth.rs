use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::auth::Caller;

use super::error::ApiError;
use super::state::AppState;

/// Extracts an administrative caller from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the token is missing or unknown, 403 when the
/// caller is not an admin.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub Caller);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = authenticated(parts, state)?;
        if !caller.role.is_admin() {
            debug!(user_id = %caller.user_id, role = %caller.role, "non-admin caller rejected");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(Self(caller))
    }
}

/// Like [`AdminCaller`], but only the `super_admin` role passes. Guards
/// issue writes.
#[derive(Debug, Clone)]
pub struct SuperAdminCaller(pub Caller);

impl FromRequestParts<AppState> for SuperAdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = authenticated(parts, state)?;
        if !caller.role.is_super_admin() {
            debug!(user_id = %caller.user_id, role = %caller.role, "caller lacks super_admin");
            return Err(ApiError::forbidden("Super admin access required"));
        }
        Ok(Self(caller))
    }
}

fn authenticated(parts: &Parts, state: &AppState) -> Result<Caller, ApiError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    state
        .authenticator
        .authenticate(token)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
