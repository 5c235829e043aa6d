// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone-auth API Server
//!
//! Signs users in with an externally verified phone number and lets them
//! complete their profile.

use phone_auth_api::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryUserStore, UserStore},
    services::{CloudinaryUploader, DisabledUploader, MediaUploader},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting phone-auth API");

    let store: Arc<dyn UserStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; data is lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let uploader: Arc<dyn MediaUploader> = match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(cloud = %cloudinary.cloud_name, "Cloudinary uploads enabled");
            Arc::new(CloudinaryUploader::new(cloudinary.clone()))
        }
        None => {
            tracing::warn!("Cloudinary credentials not set, profile picture uploads disabled");
            Arc::new(DisabledUploader)
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, uploader));

    // Build router
    let app = phone_auth_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("phone_auth_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
