// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone-auth API: phone-number login and profile updates.
//!
//! This crate provides the backend API that signs users in with a phone
//! number verified by an external auth provider, issues session tokens,
//! and lets users complete their profile.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserStore;
use services::{MediaUploader, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub uploader: Arc<dyn MediaUploader>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        uploader: Arc<dyn MediaUploader>,
    ) -> Self {
        let tokens = TokenService::from_config(&config);
        Self {
            config,
            store,
            uploader,
            tokens,
        }
    }
}
