use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::ApiError,
    leads::{dto::CreateLeadRequest, repo_types::EmailLead},
    state::AppState,
};

pub fn lead_routes() -> Router<AppState> {
    Router::new().route("/leads", post(create_lead))
}

#[instrument(skip(state, payload))]
pub async fn create_lead(
    State(state): State<AppState>,
    payload: Result<Json<CreateLeadRequest>, JsonRejection>,
) -> Result<Json<EmailLead>, ApiError> {
    let Json(payload) = payload?;
    let payload = payload.normalize()?;

    let lead = state
        .leads
        .capture(&payload.email, payload.name.as_deref())
        .await?;
    Ok(Json(lead))
}
