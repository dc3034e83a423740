use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    blog::{dto::ListQuery, repo_types::BlogPost},
    error::ApiError,
    state::AppState,
};

pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/blog/posts", get(list_posts))
        .route("/blog/posts/:slug", get(get_post))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let Query(q) = query?;
    let posts = state.content.list_posts(q.limit).await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state.content.get_post_by_slug(&slug).await?;
    Ok(Json(post))
}
