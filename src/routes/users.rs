// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone login, session refresh and profile routes.

use crate::config::AuthIdMismatchPolicy;
use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ProfileUpdate, Role, User, UserResponse};
use crate::routes::cookies::{self, REFRESH_TOKEN_COOKIE};
use crate::routes::response::ApiResponse;
use crate::services::{ids, ImageUpload, TokenPair};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Multipart, Request, State},
    http::header,
    routing::{patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const LOGIN_FIELDS_REQUIRED: &str = "Phone number and Auth ID are required";
const FULL_NAME_REQUIRED: &str = "Full Name is required";

/// Routes that do not need a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes that need a valid access token.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/update-profile", patch(update_profile))
        .route("/logout", post(logout))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub auth_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Log in with a phone number verified by the external auth provider.
///
/// Creates the user on first login. Rotates the stored refresh token and
/// returns both tokens as cookies and in the body.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (phone, auth_id) = match (non_blank(request.phone), non_blank(request.auth_id)) {
        (Some(phone), Some(auth_id)) => (phone, auth_id),
        _ => return Err(AppError::BadRequest(LOGIN_FIELDS_REQUIRED.to_string())),
    };

    let user = find_or_create_user(&state, &auth_id, &phone).await?;
    let user = reconcile_identity(&state, user, &auth_id, &phone).await?;

    let pair = issue_session(&state, &user).await?;

    let logged_in = state
        .store
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

    tracing::info!(user_id = %logged_in.id, "User logged in");

    let jar = cookies::set_session_cookies(jar, &pair, &state.tokens, state.config.cookie_secure);
    let body = LoginResponse {
        user: logged_in.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, Json(ApiResponse::ok(body, "User logged in Successfully"))))
}

/// Look up the user by auth ID or phone, creating one if neither matches.
async fn find_or_create_user(state: &AppState, auth_id: &str, phone: &str) -> Result<User> {
    if let Some(user) = state.store.find_by_auth_id_or_phone(auth_id, phone).await? {
        return Ok(user);
    }

    let user = User::new(ids::new_user_id()?, auth_id, phone, &now_rfc3339());

    match state.store.create(&user).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "New user created on first login");
            Ok(user)
        }
        // Lost a race with a concurrent first login; use the winner's record.
        Err(StoreError::Duplicate(field)) => {
            tracing::warn!(field, "Concurrent signup detected, re-reading user");
            state
                .store
                .find_by_auth_id_or_phone(auth_id, phone)
                .await?
                .ok_or_else(|| AppError::Conflict("User is being created, retry login".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply the configured policy when the matched user's identifiers differ
/// from the supplied ones.
async fn reconcile_identity(
    state: &AppState,
    user: User,
    auth_id: &str,
    phone: &str,
) -> Result<User> {
    if user.auth_id == auth_id && user.phone == phone {
        return Ok(user);
    }

    let conflict = if user.auth_id == auth_id {
        "Auth ID is linked to a different phone number"
    } else {
        "Phone number is linked to a different account"
    };

    match state.config.auth_id_mismatch_policy {
        AuthIdMismatchPolicy::Reject => {
            tracing::warn!(user_id = %user.id, reason = conflict, "Login rejected");
            Err(AppError::Conflict(conflict.to_string()))
        }
        AuthIdMismatchPolicy::Rebind => {
            tracing::info!(user_id = %user.id, reason = conflict, "Rebinding user identity");
            Ok(state.store.rebind_identity(&user.id, auth_id, phone).await?)
        }
        AuthIdMismatchPolicy::Allow => {
            tracing::warn!(user_id = %user.id, reason = conflict, "Identity mismatch allowed");
            Ok(user)
        }
    }
}

/// Sign a token pair and store the refresh token on the user.
async fn issue_session(state: &AppState, user: &User) -> Result<TokenPair> {
    let pair = state.tokens.issue_pair(user).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("{}: {}", AppError::TOKEN_GENERATION_FAILED, e))
    })?;

    state
        .store
        .set_refresh_token(&user.id, Some(&pair.refresh_token))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("{}: {}", AppError::TOKEN_GENERATION_FAILED, e))
        })?;

    Ok(pair)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Refresh / Logout ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange the current refresh token for a new pair.
///
/// The token is read from the cookie, or from `{ refreshToken }` in the body
/// for clients without cookies. Only the most recently issued refresh token
/// is accepted.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<ApiResponse<TokenResponse>>)> {
    let presented = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) => Some(cookie.value().to_string()),
        None if body.is_empty() => None,
        None => serde_json::from_slice::<RefreshRequest>(&body)
            .unwrap_or_default()
            .refresh_token,
    };
    let presented = non_blank(presented).ok_or(AppError::Unauthorized)?;

    let claims = state.tokens.verify_refresh_token(&presented)?;

    let user = state
        .store
        .find_by_id(&claims.id)
        .await?
        .ok_or(AppError::InvalidToken("Invalid refresh token"))?;

    let current = user.refresh_token.as_deref().unwrap_or("");
    if !bool::from(current.as_bytes().ct_eq(presented.as_bytes())) {
        tracing::warn!(user_id = %user.id, "Stale refresh token presented");
        return Err(AppError::InvalidToken("Refresh token is expired or used"));
    }

    let pair = issue_session(&state, &user).await?;
    tracing::info!(user_id = %user.id, "Session refreshed");

    let jar = cookies::set_session_cookies(jar, &pair, &state.tokens, state.config.cookie_secure);
    let body = TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, Json(ApiResponse::ok(body, "Access token refreshed"))))
}

/// End the session: forget the refresh token and expire both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<serde_json::Value>>)> {
    state.store.set_refresh_token(&user.id, None).await?;
    tracing::info!(user_id = %user.id, "User logged out");

    let jar = cookies::clear_session_cookies(jar, state.config.cookie_secure);
    Ok((
        jar,
        Json(ApiResponse::ok(serde_json::json!({}), "User logged out")),
    ))
}

// ─── Profile ─────────────────────────────────────────────────

/// Profile update input, from multipart form data or JSON.
///
/// Blank text fields count as absent.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 100, message = "Full Name must be at most 100 characters"))]
    pub full_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Subject must be at most 100 characters"))]
    pub subject: Option<String>,
    #[serde(skip)]
    pub profile_pic: Option<ImageUpload>,
}

impl ProfileForm {
    /// Validate the form and split it into the update and the image to upload.
    pub fn into_update(self) -> Result<(ProfileUpdate, Option<ImageUpload>)> {
        let form = ProfileForm {
            full_name: non_blank(self.full_name),
            email: non_blank(self.email),
            role: non_blank(self.role),
            subject: non_blank(self.subject),
            profile_pic: self.profile_pic,
        };

        let full_name = form
            .full_name
            .clone()
            .ok_or_else(|| AppError::BadRequest(FULL_NAME_REQUIRED.to_string()))?;

        form.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Invalid profile data".to_string());
            AppError::BadRequest(message)
        })?;

        let role = form
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if let Some(image) = &form.profile_pic {
            if !image.content_type.starts_with("image/") {
                return Err(AppError::BadRequest(
                    "Profile picture must be an image".to_string(),
                ));
            }
        }

        let update = ProfileUpdate {
            full_name,
            email: form.email,
            role,
            subject: form.subject,
            profile_pic: None,
        };

        Ok((update, form.profile_pic))
    }
}

impl<S> FromRequest<S> for ProfileForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(form) = Json::<ProfileForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = ProfileForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "profilePic" {
                let file_name = field.file_name().unwrap_or("profile-pic").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.profile_pic = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let slot = match name.as_str() {
                "fullName" => &mut form.full_name,
                "email" => &mut form.email,
                "role" => &mut form.role,
                "subject" => &mut form.subject,
                _ => continue,
            };
            *slot = Some(
                field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?,
            );
        }

        Ok(form)
    }
}

/// Update the caller's profile and mark it complete.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthUser>>,
    form: ProfileForm,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let Some(Extension(auth)) = auth else {
        return Err(AppError::Unauthorized);
    };

    let (mut update, image) = form.into_update()?;

    if let Some(image) = image {
        let uploaded = state.uploader.upload_image(image).await?;
        update.profile_pic = Some(uploaded.url);
    }

    let user = state.store.update_profile(&auth.id, &update).await?;
    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(ApiResponse::ok(
        user.into(),
        "Account details updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(full_name: Option<&str>) -> ProfileForm {
        ProfileForm {
            full_name: full_name.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_full_name_is_missing() {
        let err = form(Some("   ")).into_update().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == FULL_NAME_REQUIRED));

        let err = form(None).into_update().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_blank_optionals_become_absent() {
        let mut f = form(Some(" Ada "));
        f.email = Some(String::new());
        f.subject = Some("  ".to_string());

        let (update, image) = f.into_update().unwrap();
        assert_eq!(update.full_name, "Ada");
        assert_eq!(update.email, None);
        assert_eq!(update.role, None);
        assert_eq!(update.subject, None);
        assert!(image.is_none());
    }

    #[test]
    fn test_invalid_role_rejected() {
        let mut f = form(Some("Ada"));
        f.role = Some("PRINCIPAL".to_string());
        assert!(matches!(f.into_update(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut f = form(Some("Ada"));
        f.email = Some("not-an-email".to_string());
        let err = f.into_update().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Email address is invalid"));
    }

    #[test]
    fn test_non_image_upload_rejected() {
        let mut f = form(Some("Ada"));
        f.profile_pic = Some(ImageUpload {
            file_name: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1],
        });
        assert!(matches!(f.into_update(), Err(AppError::BadRequest(_))));
    }
}
