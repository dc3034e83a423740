use serde::Deserialize;

use crate::auth::services::is_valid_email;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateLeadRequest {
    pub fn normalize(mut self) -> Result<Self, ApiError> {
        self.email = self.email.trim().to_string();
        self.name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        Ok(self)
    }
}
