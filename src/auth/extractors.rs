use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::{
    repo_types::User,
    services::{AuthError, AuthService},
};
use crate::error::AppError;

const INVALID_TOKEN: &str = "invalid or expired token";

/// Authenticated caller, attached to request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub user_id: Uuid,
}

/// Accepts exactly `Bearer <token>`: two space-separated parts, case-sensitive scheme.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

pub async fn authorize(auth: &AuthService, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authorization header is required".into()))?;

    let token = header.to_str().ok().and_then(parse_bearer).ok_or_else(|| {
        AppError::Unauthorized("Authorization header must be 'Bearer {token}'".into())
    })?;

    let user_id = auth.validate_token(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthorized(INVALID_TOKEN.into())
    })?;

    let user = auth.get_user_by_id(user_id).await.map_err(|e| {
        match &e {
            AuthError::NotFound => warn!(user_id = %user_id, "token subject no longer exists"),
            other => error!(error = %other, user_id = %user_id, "user lookup failed"),
        }
        AppError::Unauthorized(INVALID_TOKEN.into())
    })?;

    Ok(CurrentUser { user, user_id })
}

/// Middleware guarding protected routes.
pub async fn require_auth(
    State(auth): State<AuthService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = authorize(&auth, req.headers()).await?;
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            error!("CurrentUser extracted on a route without require_auth");
            AppError::Unauthorized(INVALID_TOKEN.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_accepts_exact_shape() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn parse_bearer_rejects_other_shapes() {
        assert_eq!(parse_bearer("Token abc"), None);
        assert_eq!(parse_bearer("bearer abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer  abc"), None);
        assert_eq!(parse_bearer("Bearer abc def"), None);
        assert_eq!(parse_bearer("abc"), None);
        assert_eq!(parse_bearer(""), None);
    }
}
