//! Cookie builder for the session token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the session token.
pub const MARCHE_SESSION_TOKEN: &str = "marche_session";

/// Session-token JWT lifetime and cookie Max-Age in seconds (7 days).
pub const SESSION_TOKEN_EXP: u64 = 604800;

/// Set the session-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use marche_auth_types::cookie::{set_session_cookie, MARCHE_SESSION_TOKEN};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "token_value".to_string(), "example.com".to_string());
/// let cookie = jar.get(MARCHE_SESSION_TOKEN).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604800)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    let cookie = Cookie::build((MARCHE_SESSION_TOKEN, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(SESSION_TOKEN_EXP as i64))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
