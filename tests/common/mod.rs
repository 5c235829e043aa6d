// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use phone_auth_api::config::Config;
use phone_auth_api::db::{FirestoreDb, MemoryUserStore};
use phone_auth_api::error::AppError;
use phone_auth_api::routes::create_router;
use phone_auth_api::services::{ImageUpload, MediaUploader, UploadedMedia};
use phone_auth_api::AppState;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Uploader that records what it was given and answers with a fixed URL.
#[allow(dead_code)]
pub struct RecordingUploader {
    pub uploads: Mutex<Vec<ImageUpload>>,
    pub url: String,
    pub fail: bool,
}

#[allow(dead_code)]
impl RecordingUploader {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            url: "https://res.cloudinary.com/demo/image/upload/v1/avatar.png".to_string(),
            fail: false,
        }
    }

    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl MediaUploader for RecordingUploader {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedMedia, AppError> {
        self.uploads.lock().unwrap().push(image);
        if self.fail {
            return Err(AppError::Upload("HTTP 500: boom".to_string()));
        }
        Ok(UploadedMedia {
            url: self.url.clone(),
        })
    }
}

/// Router plus handles on the fakes behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryUserStore>,
    pub uploader: Arc<RecordingUploader>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in and return the response body.
    #[allow(dead_code)]
    pub async fn login(&self, phone: &str, auth_id: &str) -> Value {
        let response = self
            .send(json_request(
                "POST",
                "/login",
                serde_json::json!({ "phone": phone, "authId": auth_id }),
            ))
            .await;
        assert_eq!(response.status(), 200, "login should succeed");
        body_json(response).await
    }
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), RecordingUploader::new())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, uploader: RecordingUploader) -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    let uploader = Arc::new(uploader);
    let state = Arc::new(AppState::new(config, store.clone(), uploader.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        uploader,
    }
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value part of a `Set-Cookie` header.
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    let pair = set_cookie.split(';').next().unwrap();
    pair.split_once('=').unwrap().1.to_string()
}

#[allow(dead_code)]
pub const BOUNDARY: &str = "X-PHONE-AUTH-BOUNDARY";

/// Build a `multipart/form-data` body with text fields and an optional
/// `profilePic` file `(filename, content type, bytes)`.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profilePic\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_request(uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}
