use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{dao::models::UserId, error::AppError};

/// Header carrying the authenticated user id, set by the upstream session layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .filter(|id| *id > 0)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized(format!("invalid `{USER_ID_HEADER}` header")))
    }
}
