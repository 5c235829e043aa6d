// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile picture hosting.
//!
//! Handles:
//! - Signed uploads to Cloudinary's image upload API
//! - A disabled uploader for deployments without media credentials

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// An image received from the client, held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where the media host stored an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
}

/// Uploads images to a media host.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedMedia, AppError>;
}

/// Uploader used when no media host is configured. Every upload fails.
pub struct DisabledUploader;

#[async_trait]
impl MediaUploader for DisabledUploader {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedMedia, AppError> {
        tracing::warn!(file = %image.file_name, "Image upload attempted but media host is not configured");
        Err(AppError::Upload("media host not configured".to_string()))
    }
}

/// Cloudinary API client.
#[derive(Clone)]
pub struct CloudinaryUploader {
    http: reqwest::Client,
    base_url: String,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            config,
        }
    }

    /// Parameters that are covered by the signature, sorted by name.
    fn signed_params(&self, timestamp: u64) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }
        params.push(("timestamp", timestamp.to_string()));
        params
    }

    fn sign(&self, params: &[(&'static str, String)]) -> String {
        sign_params(params, &self.config.api_secret)
    }
}

/// Cloudinary request signature: SHA-256 over `k1=v1&k2=v2` (sorted by key)
/// with the API secret appended.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);

    let to_sign = sorted
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedMedia, AppError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs();

        let params = self.signed_params(timestamp);
        let signature = self.sign(&params);

        let size = image.bytes.len();
        let file = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid image content type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let url = format!("{}/{}/image/upload", self.base_url, self.config.cloud_name);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let body: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("JSON parse error: {}", e)))?;

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| AppError::Upload("response did not include a URL".to_string()))?;

        tracing::info!(file = %image.file_name, size, "Profile picture uploaded");

        Ok(UploadedMedia { url })
    }
}
