use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo_types::User;
use crate::error::ApiError;

use super::services::is_valid_email;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the third-party session exchange.
#[derive(Debug, Deserialize)]
pub struct SessionExchangeRequest {
    pub session_id: String,
}

/// Response returned after signup, login or session exchange.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub is_premium: bool,
    #[serde(with = "crate::timestamp")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            name: u.name,
            picture: u.picture,
            is_premium: u.is_premium,
            created_at: u.created_at,
        }
    }
}

/// Tokens a request may authenticate with. The cookie wins over the bearer header.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub cookie_token: Option<String>,
    pub bearer_token: Option<String>,
}

impl Credentials {
    pub fn token(&self) -> Option<&str> {
        self.cookie_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.bearer_token.as_deref().filter(|t| !t.is_empty()))
    }
}

impl SignupRequest {
    pub fn normalize(mut self) -> Result<Self, ApiError> {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        if self.password.is_empty() {
            return Err(ApiError::Validation("Password is required".into()));
        }
        Ok(self)
    }
}

impl LoginRequest {
    pub fn normalize(mut self) -> Result<Self, ApiError> {
        self.email = self.email.trim().to_string();
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        Ok(self)
    }
}
