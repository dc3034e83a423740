use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>, // absent for third-party accounts
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(with = "crate::timestamp")]
    pub created_at: OffsetDateTime,
}

/// Session document in the `user_sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub session_token: String,
    #[serde(with = "crate::timestamp")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "crate::timestamp")]
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}
