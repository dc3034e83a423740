use std::sync::Arc;

use anyhow::Context;

use crate::auth::provider::{HttpIdentityProvider, IdentityProvider};
use crate::auth::services::AuthService;
use crate::blog::services::ContentService;
use crate::config::{AppConfig, StoreBackend};
use crate::leads::services::LeadService;
use crate::store::{DocumentStore, MemoryStore, PostgresStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthService,
    pub content: ContentService,
    pub leads: LeadService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let pg = PostgresStore::connect(url, config.database_name.as_deref()).await?;
                pg.migrate().await?;
                Arc::new(pg)
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let identity = Arc::new(HttpIdentityProvider::new(&config.identity_provider_url))
            as Arc<dyn IdentityProvider>;

        Ok(Self::from_parts(Arc::new(config), store, identity))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), identity, config.session_ttl()),
            content: ContentService::new(store.clone()),
            leads: LeadService::new(store.clone()),
            store,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake(identity: Arc<dyn IdentityProvider>) -> Self {
        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_name: None,
            jwt_secret: "test".into(),
            cors_origins: vec!["*".into()],
            identity_provider_url: "http://127.0.0.1:9".into(),
            session_ttl_days: 7,
        });
        Self::from_parts(config, Arc::new(MemoryStore::new()), identity)
    }
}
