use std::net::SocketAddr;

use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, blog, leads};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(blog::router())
                .merge(leads::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Credentialed CORS; `*` mirrors the caller's origin since browsers reject a
/// wildcard together with credentials.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::tests::fake_provider;
    use crate::blog::services::seed_posts;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> Router {
        let state = AppState::fake(Arc::new(fake_provider(Some("https://pic"))));
        state.content.seed_if_empty(seed_posts()).await.unwrap();
        build_app(state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(res: &Response) -> String {
        res.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn signup(app: &Router, email: &str) -> String {
        let res = app
            .clone()
            .oneshot(post_json(
                "/api/auth/signup",
                json!({"email": email, "password": "p1", "name": "A"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        json_body(res).await["session_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn signup_then_duplicate_signup() {
        let app = app().await;
        let body = json!({"email": "a@x.com", "password": "p1", "name": "A"});

        let res = app.clone().oneshot(post_json("/api/auth/signup", body.clone())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = set_cookie(&res);
        assert!(cookie.starts_with("session_token=session_"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        let v = json_body(res).await;
        assert_eq!(v["user"]["email"], "a@x.com");
        assert!(v["user"].get("password_hash").is_none());
        assert!(v["session_token"].as_str().unwrap().starts_with("session_"));

        let res = app.oneshot(post_json("/api/auth/signup", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn malformed_signup_is_bad_request() {
        let app = app().await;
        let res = app
            .clone()
            .oneshot(post_json("/api/auth/signup", json!({"email": "nope", "password": "p1", "name": "A"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(post_json("/api/auth/signup", json!({"email": "a@x.com"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn me_without_credentials_is_unauthorized() {
        let app = app().await;
        let res = app.oneshot(get("/api/auth/me")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn me_with_cookie_or_bearer() {
        let app = app().await;
        let token = signup(&app, "a@x.com").await;

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::COOKIE, format!("session_token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["email"], "a@x.com");

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_failures_share_status_and_message() {
        let app = app().await;
        signup(&app, "a@x.com").await;

        let wrong = app
            .clone()
            .oneshot(post_json("/api/auth/login", json!({"email": "a@x.com", "password": "bad"})))
            .await
            .unwrap();
        let unknown = app
            .oneshot(post_json("/api/auth/login", json!({"email": "z@x.com", "password": "p1"})))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(wrong).await, json_body(unknown).await);
    }

    #[tokio::test]
    async fn logout_revokes_all_sessions() {
        let app = app().await;
        let first = signup(&app, "a@x.com").await;
        let res = app
            .clone()
            .oneshot(post_json("/api/auth/login", json!({"email": "a@x.com", "password": "p1"})))
            .await
            .unwrap();
        let second = json_body(res).await["session_token"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .header(header::AUTHORIZATION, format!("Bearer {first}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookie(&res).contains("Max-Age=0"));
        assert_eq!(json_body(res).await["message"], "Logged out successfully");

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {second}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn google_session_exchange() {
        let app = app().await;
        let res = app
            .clone()
            .oneshot(post_json("/api/auth/google/session", json!({"session_id": "sid-good"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookie(&res).starts_with("session_token=provider-token"));
        let v = json_body(res).await;
        assert_eq!(v["session_token"], "provider-token");
        assert_eq!(v["user"]["picture"], "https://pic");

        let res = app
            .oneshot(post_json("/api/auth/google/session", json!({"session_id": "sid-bad"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["detail"], "Invalid session ID");
    }

    #[tokio::test]
    async fn blog_listing_and_lookup() {
        let app = app().await;
        let res = app.clone().oneshot(get("/api/blog/posts")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let posts = json_body(res).await;
        assert_eq!(posts.as_array().unwrap().len(), 3);

        let res = app.clone().oneshot(get("/api/blog/posts?limit=1")).await.unwrap();
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);

        let res = app.clone().oneshot(get("/api/blog/posts?limit=abc")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
        let detail = json_body(res).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("query string"), "{detail}");

        let res = app
            .clone()
            .oneshot(get("/api/blog/posts/technical-analysis-101"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["post_id"], "post_003");

        let res = app.oneshot(get("/api/blog/posts/does-not-exist")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["detail"], "Post not found");
    }

    #[tokio::test]
    async fn lead_capture_is_idempotent() {
        let app = app().await;
        let body = json!({"email": "l@x.com"});
        let first = app.clone().oneshot(post_json("/api/leads", body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(post_json("/api/leads", body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let a = json_body(first).await;
        let b = json_body(second).await;
        assert_eq!(a["lead_id"], b["lead_id"]);
        assert!(a["name"].is_null());
    }

    #[tokio::test]
    async fn health() {
        let app = app().await;
        let res = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
