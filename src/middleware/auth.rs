// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::routes::cookies::ACCESS_TOKEN_COOKIE;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].trim().to_string(),
            _ => return Err(AppError::Unauthorized),
        }
    };

    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let claims = state.tokens.verify_access_token(&token)?;

    // The token may outlive the user record.
    let user = state
        .store
        .find_by_id(&claims.id)
        .await?
        .ok_or(AppError::InvalidToken("Invalid access token"))?;

    request.extensions_mut().insert(AuthUser { id: user.id });

    Ok(next.run(request).await)
}
