use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Identity asserted by the external provider for a one-time session id.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderIdentity {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected session id with status {0}")]
    Rejected(StatusCode),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn session_data(&self, session_id: &str) -> Result<ProviderIdentity, ProviderError>;
}

/// Talks to `<base_url>/oauth/session-data`. Single attempt, no retries.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn session_data(&self, session_id: &str) -> Result<ProviderIdentity, ProviderError> {
        let url = format!("{}/oauth/session-data", self.base_url);
        let res = self
            .client
            .get(&url)
            .header("X-Session-ID", session_id)
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            warn!(%status, "identity provider rejected session id");
            return Err(ProviderError::Rejected(status));
        }
        let identity = res.json::<ProviderIdentity>().await?;
        debug!(email = %identity.email, "identity provider session resolved");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_session_id_header_and_decodes_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/session-data"))
            .and(header("X-Session-ID", "sid-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "g@x.com",
                "name": "G",
                "picture": "https://pic",
                "session_token": "provider-token",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&format!("{}/", server.uri()));
        let identity = provider.session_data("sid-123").await.unwrap();
        assert_eq!(identity.email, "g@x.com");
        assert_eq!(identity.picture.as_deref(), Some("https://pic"));
        assert_eq!(identity.session_token, "provider-token");
    }

    #[tokio::test]
    async fn non_200_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/session-data"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&server.uri());
        let err = provider.session_data("bogus").await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(s) if s == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn missing_picture_is_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "g@x.com",
                "name": "G",
                "picture": null,
                "session_token": "t",
            })))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&server.uri());
        let identity = provider.session_data("sid").await.unwrap();
        assert!(identity.picture.is_none());
    }
}
