use super::AppState;
use crate::components::google_calendar::{TokenData, TokenStatus};
use crate::error::WrappedResult;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

/// Cookie holding the encoded Google tokens
pub const AUTH_COOKIE: &str = "gcal_auth";

/// Cookie holding the OAuth `state` of a pending sign-in
pub const STATE_COOKIE: &str = "oauth_state";

pub const AUTH_COOKIE_DAYS: i64 = 7;
const STATE_COOKIE_MINUTES: i64 = 10;

/// Cookie for tokens obtained through the OAuth flow
pub fn auth_cookie(token: &TokenData, secure: bool) -> WrappedResult<Cookie<'static>> {
    auth_cookie_with_age(token, secure, time::Duration::days(AUTH_COOKIE_DAYS))
}

/// Cookie for a token handed in directly; lives as long as the token
pub fn stored_token_cookie(token: &TokenData, secure: bool) -> WrappedResult<Cookie<'static>> {
    auth_cookie_with_age(token, secure, time::Duration::hours(1))
}

fn auth_cookie_with_age(
    token: &TokenData,
    secure: bool,
    max_age: time::Duration,
) -> WrappedResult<Cookie<'static>> {
    Ok(Cookie::build((AUTH_COOKIE, token.encode()?))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build())
}

pub fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, state.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::minutes(STATE_COOKIE_MINUTES))
        .build()
}

/// Removal cookie matching the path the named cookie was set with
pub fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Tokens from the auth cookie, if present and readable
pub fn stored_token(jar: &CookieJar) -> Option<TokenData> {
    let cookie = jar.get(AUTH_COOKIE)?;
    match TokenData::decode(cookie.value()) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!("Ignoring unreadable auth cookie: {}", e);
            None
        }
    }
}

/// Resolve the cookie token into a usable access token, refreshing it when
/// expired. The returned jar carries the refreshed cookie, or drops a token
/// that can no longer be used.
pub async fn current_token(state: &AppState, jar: CookieJar) -> (CookieJar, Option<String>) {
    let status = state.tokens.valid_token(stored_token(&jar)).await;

    match status {
        TokenStatus::Valid(token) => (jar, Some(token.access_token)),
        TokenStatus::Refreshed(token) => match auth_cookie(&token, state.secure_cookies) {
            Ok(cookie) => (jar.add(cookie), Some(token.access_token)),
            Err(e) => {
                warn!("Could not store refreshed token: {}", e);
                (jar, Some(token.access_token))
            }
        },
        TokenStatus::Expired => (jar.remove(removal(AUTH_COOKIE)), None),
        TokenStatus::Missing => (jar, None),
    }
}
