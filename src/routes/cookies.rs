// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie construction.

use crate::services::{TokenPair, TokenService};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::time::Duration;

/// Cookie holding the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// HttpOnly session cookie living as long as the token it carries.
pub fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .build()
}

/// Add both session cookies for a freshly issued token pair.
pub fn set_session_cookies(
    jar: CookieJar,
    pair: &TokenPair,
    tokens: &TokenService,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        tokens.access_ttl(),
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        tokens.refresh_ttl(),
        secure,
    ))
}

/// Expire both session cookies. Attributes match the ones they were set with.
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    let removal = |name: &'static str| {
        Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .build()
    };
    jar.remove(removal(ACCESS_TOKEN_COOKIE))
        .remove(removal(REFRESH_TOKEN_COOKIE))
}
