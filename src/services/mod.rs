// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ids;
pub mod media;
pub mod tokens;

pub use media::{CloudinaryUploader, DisabledUploader, ImageUpload, MediaUploader, UploadedMedia};
pub use tokens::{AccessClaims, RefreshClaims, TokenPair, TokenService};
