use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookie::{removal_cookie, session_cookie},
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, SessionExchangeRequest,
            SignupRequest,
        },
        extractors::CurrentUser,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/google/session", post(google_session))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn with_session_cookie(state: &AppState, user: PublicUser, token: String) -> impl IntoResponse {
    let cookie = session_cookie(&token, state.auth.session_ttl());
    (
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            session_token: token,
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let payload = payload.normalize()?;

    let (user, token) = state
        .auth
        .signup(&payload.email, &payload.password, &payload.name)
        .await?;
    Ok(with_session_cookie(&state, user, token))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let payload = payload.normalize()?;

    let (user, token) = state.auth.login(&payload.email, &payload.password).await?;
    Ok(with_session_cookie(&state, user, token))
}

#[instrument(skip(state, payload))]
pub async fn google_session(
    State(state): State<AppState>,
    payload: Result<Json<SessionExchangeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    if payload.session_id.trim().is_empty() {
        return Err(ApiError::Validation("session_id is required".into()));
    }

    let (user, token) = state.auth.exchange_session(payload.session_id.trim()).await?;
    Ok(with_session_cookie(&state, user, token))
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user)
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(&user.user_id).await?;
    Ok((
        [(header::SET_COOKIE, removal_cookie())],
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    ))
}
