mod app;
mod auth;
mod blog;
mod config;
mod error;
mod leads;
mod state;
mod store;
mod timestamp;

use crate::blog::services::seed_posts;
use crate::config::{AppConfig, DEFAULT_JWT_SECRET};
use crate::state::AppState;
use crate::store::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tradeacademy=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    if config.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET not set; sessions do not use it, but set it before enabling signed tokens");
    }

    let app_state = AppState::init(config).await?;

    if let Err(e) = app_state.content.seed_if_empty(seed_posts()).await {
        tracing::warn!(error = %e, "blog seeding failed; continuing");
    }

    let store = app_state.store.clone();
    let result = app::serve(app::build_app(app_state)).await;

    store.close().await;
    tracing::info!("storage closed");
    result
}
