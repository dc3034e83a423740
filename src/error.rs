use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    auth::services::AuthError, blog::services::ContentError, leads::services::LeadError,
    store::StoreError,
};

/// Errors as seen by HTTP clients. Bodies are `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::Upstream(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "Internal server error".to_string()
            }
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::NotFound(msg)
            | ApiError::Upstream(msg) => msg,
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let msg = e.to_string();
        match e {
            AuthError::DuplicateEmail => ApiError::Conflict(msg),
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::InvalidSession
            | AuthError::SessionExpired => ApiError::Unauthenticated(msg),
            AuthError::UserNotFound => ApiError::NotFound(msg),
            AuthError::InvalidSessionId | AuthError::Upstream(_) => ApiError::Upstream(msg),
            AuthError::Store(_) | AuthError::Hashing(_) => ApiError::Internal(msg),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::NotFound => ApiError::NotFound(ContentError::NotFound.to_string()),
            ContentError::Store(inner) => inner.into(),
        }
    }
}

impl From<LeadError> for ApiError {
    fn from(e: LeadError) -> Self {
        match e {
            LeadError::Store(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_taxonomy() {
        assert_eq!(ApiError::from(AuthError::DuplicateEmail).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(AuthError::SessionExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AuthError::UserNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AuthError::InvalidSessionId).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let res = ApiError::Internal("pool timed out".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["detail"], "Internal server error");
    }
}
