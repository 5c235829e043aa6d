// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Handlers talk to a [`UserStore`]; production uses Firestore, tests and
//! local development use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryUserStore;

use crate::models::{ProfileUpdate, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Claim documents keyed by auth ID, enforcing uniqueness
    pub const USER_AUTH_IDS: &str = "user_auth_ids";
    /// Claim documents keyed by phone number, enforcing uniqueness
    pub const USER_PHONES: &str = "user_phones";
}

/// Errors returned by a [`UserStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field (`authId` or `phone`) is already taken.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Persistence for user records.
///
/// Implementations must keep `auth_id` and `phone` unique across users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by document ID.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Find the user owning `auth_id`, or failing that the one owning `phone`.
    async fn find_by_auth_id_or_phone(
        &self,
        auth_id: &str,
        phone: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if its auth ID
    /// or phone is already taken.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Replace the stored refresh token (`None` ends the session).
    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<(), StoreError>;

    /// Move a user onto a new auth ID and phone, keeping uniqueness.
    async fn rebind_identity(
        &self,
        id: &str,
        auth_id: &str,
        phone: &str,
    ) -> Result<User, StoreError>;

    /// Apply a profile update and return the stored result.
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError>;
}
