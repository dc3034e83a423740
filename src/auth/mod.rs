use crate::state::AppState;
use axum::Router;

pub mod cookie;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod provider;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
