use axum::http::{header, HeaderMap};
use ::cookie::{Cookie, SameSite};
use time::Duration;

pub const SESSION_COOKIE: &str = "session_token";

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(ttl)
        .build()
        .to_string()
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn removal_cookie() -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

/// Session token from any `Cookie` header on the request.
pub fn read_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw).filter_map(Result::ok))
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}
