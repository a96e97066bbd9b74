use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use uuid::Uuid;
use vitals_core::constants::SESSION_COOKIE_NAME;
use vitals_core::RelayConfig;

/// Session id carried by the request, if the cookie is present and well formed.
pub(crate) fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Create the session cookie.
pub(crate) fn session_cookie(session_id: Uuid, cfg: &RelayConfig) -> Cookie<'static> {
    let max_age = i64::try_from(cfg.session_ttl().as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(cfg.secure_cookies())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

/// Cookie that clears the session cookie.
pub(crate) fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()
}
