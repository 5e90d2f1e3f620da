use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, principal::Principal};
use crate::{error::AppError, state::AppState, users::model::User};

/// Authenticated caller: the verified principal and the account behind it.
pub struct CurrentUser {
    pub principal: Principal,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Not authorized, no token provided".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Not authorized, no token provided".into()))?;

        let keys = JwtKeys::from_ref(state);
        let user_id = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Authentication("Not authorized, token failed".into())
        })?;

        // Role comes from the live record; a deleted account loses access at once
        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".into()))?;

        Ok(Self {
            principal: Principal::from_user(&user),
            user,
        })
    }
}
