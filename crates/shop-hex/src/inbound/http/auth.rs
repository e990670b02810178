use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shop_types::domain::UserId;

use crate::errors::AppError;

/// Header the upstream auth layer sets to the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity. Rejects with 401 when the header is absent or not an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .filter(|id| *id > 0)
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthUser(id))
    }
}
