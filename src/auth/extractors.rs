use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::warn;

use super::cookie::read_session_cookie;
use super::dto::{Credentials, PublicUser};
use crate::error::ApiError;
use crate::state::AppState;

#[async_trait]
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer_token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|auth| {
                auth.strip_prefix("Bearer ")
                    .or_else(|| auth.strip_prefix("bearer "))
            })
            .map(|t| t.trim().to_string());

        Ok(Credentials {
            cookie_token: read_session_cookie(&parts.headers),
            bearer_token,
        })
    }
}

/// Resolves the session behind the request to its user, rejecting with 401/404.
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let creds = Credentials::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        match state.auth.resolve_current_user(&creds).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(e) => {
                warn!(error = %e, "request authentication failed");
                Err(e.into())
            }
        }
    }
}
