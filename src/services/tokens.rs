// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token signing.
//!
//! Both tokens are HS256 JWTs signed with separate secrets, so a refresh
//! token is never accepted where an access token is expected. Every token
//! carries a random `jti`, so tokens issued within the same second differ.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::services::ids::new_token_id;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// User document ID
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    /// Unique token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Claims carried by a refresh token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    #[serde(rename = "_id")]
    pub id: String,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    access_ttl: Duration,
    refresh_secret: Vec<u8>,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        access_secret: Vec<u8>,
        access_ttl: Duration,
        refresh_secret: Vec<u8>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret,
            access_ttl,
            refresh_secret,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.access_token_secret.clone(),
            config.access_token_expiry,
            config.refresh_token_secret.clone(),
            config.refresh_token_expiry,
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an access token for `user`.
    pub fn create_access_token(&self, user: &User) -> anyhow::Result<String> {
        let now = unix_now()?;
        let claims = AccessClaims {
            id: user.id.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            jti: new_token_id()?,
            iat: now,
            exp: now + self.access_ttl.as_secs() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.access_secret),
        )?)
    }

    /// Sign a refresh token for `user`.
    pub fn create_refresh_token(&self, user: &User) -> anyhow::Result<String> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            id: user.id.clone(),
            jti: new_token_id()?,
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )?)
    }

    /// Sign both tokens for `user`.
    pub fn issue_pair(&self, user: &User) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.create_access_token(user)?,
            refresh_token: self.create_refresh_token(user)?,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let key = DecodingKey::from_secret(&self.access_secret);
        decode::<AccessClaims>(token, &key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AppError::InvalidToken("Invalid access token")
            })
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let key = DecodingKey::from_secret(&self.refresh_secret);
        decode::<RefreshClaims>(token, &key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AppError::InvalidToken("Invalid refresh token")
            })
    }
}

fn unix_now() -> anyhow::Result<usize> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize)
}
