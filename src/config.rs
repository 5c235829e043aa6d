// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token secrets and lifetimes are required; everything else has a
//! development-friendly default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Which user store backs the API
    pub store_backend: StoreBackend,
    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,
    /// What login does when the stored auth ID and the supplied one disagree
    pub auth_id_mismatch_policy: AuthIdMismatchPolicy,
    /// Lifetime of access tokens
    pub access_token_expiry: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_expiry: Duration,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Media host credentials; uploads are disabled when absent
    pub cloudinary: Option<CloudinaryConfig>,
}

/// Credentials for the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Optional folder uploaded images are placed in
    pub folder: Option<String>,
}

/// User store implementation selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Policy for a login whose phone or auth ID matches a stored user
/// whose other identifier differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIdMismatchPolicy {
    /// Refuse the login with 409 Conflict.
    Reject,
    /// Store the supplied auth ID and phone on the matched user.
    Rebind,
    /// Log a warning and log in as the matched user unchanged.
    Allow,
}

impl FromStr for AuthIdMismatchPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "rebind" => Ok(Self::Rebind),
            "allow" => Ok(Self::Allow),
            _ => Err(()),
        }
    }
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            cookie_secure: true,
            auth_id_mismatch_policy: AuthIdMismatchPolicy::Reject,
            access_token_expiry: Duration::from_secs(15 * 60),
            refresh_token_expiry: Duration::from_secs(10 * 24 * 60 * 60),
            access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            refresh_token_secret: b"test_refresh_secret_32_bytes_mn!".to_vec(),
            cloudinary: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: parse_optional("STORE_BACKEND", StoreBackend::Firestore)?,
            cookie_secure: parse_bool("COOKIE_SECURE", true)?,
            auth_id_mismatch_policy: parse_optional(
                "AUTH_ID_MISMATCH_POLICY",
                AuthIdMismatchPolicy::Reject,
            )?,
            access_token_expiry: required_expiry("ACCESS_TOKEN_EXPIRY")?,
            refresh_token_expiry: required_expiry("REFRESH_TOKEN_EXPIRY")?,
            access_token_secret: required_secret("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required_secret("REFRESH_TOKEN_SECRET")?,
            cloudinary: cloudinary_from_env(),
        })
    }
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.as_bytes().to_vec())
}

fn required_expiry(name: &'static str) -> Result<Duration, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    parse_expiry(&value).ok_or(ConfigError::Invalid { name, value })
}

fn parse_optional<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        Err(_) => Ok(default),
    }
}

/// All three Cloudinary credentials must be set, otherwise uploads are off.
fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    let cloud_name = env::var("CLOUDINARY_CLOUD_NAME").ok()?;
    let api_key = env::var("CLOUDINARY_API_KEY").ok()?;
    let api_secret = env::var("CLOUDINARY_API_SECRET").ok()?;

    Some(CloudinaryConfig {
        cloud_name: cloud_name.trim().to_string(),
        api_key: api_key.trim().to_string(),
        api_secret: api_secret.trim().to_string(),
        folder: env::var("CLOUDINARY_FOLDER")
            .ok()
            .filter(|f| !f.trim().is_empty()),
    })
}

/// Parse a token lifetime such as `3600`, `90s`, `15m`, `12h`, `10d`, `1w`,
/// `1y` or `2 days`.
///
/// A bare number is seconds. Units are case-insensitive and may be
/// separated from the number by spaces; long forms (`minutes`, `hrs`,
/// `weeks`, ...) are accepted. A year is 365.25 days. Fractions and
/// millisecond units are not supported, and zero is rejected.
pub fn parse_expiry(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits.parse().ok()?;
    let multiplier = match unit.trim_start().to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        "w" | "week" | "weeks" => 7 * 24 * 60 * 60,
        "y" | "yr" | "yrs" | "year" | "years" => 31_557_600,
        _ => return None,
    };

    let secs = amount.checked_mul(multiplier)?;
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
