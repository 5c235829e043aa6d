// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user store for tests and local development.

use crate::db::{StoreError, UserStore};
use crate::models::{ProfileUpdate, User};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// User store backed by a `HashMap` behind a single lock, so uniqueness
/// checks and writes happen atomically.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn check_unique(
    users: &HashMap<String, User>,
    skip_id: Option<&str>,
    auth_id: &str,
    phone: &str,
) -> Result<(), StoreError> {
    for user in users.values() {
        if Some(user.id.as_str()) == skip_id {
            continue;
        }
        if user.auth_id == auth_id {
            return Err(StoreError::Duplicate("authId"));
        }
        if user.phone == phone {
            return Err(StoreError::Duplicate("phone"));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_auth_id_or_phone(
        &self,
        auth_id: &str,
        phone: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        let found = users
            .values()
            .find(|u| u.auth_id == auth_id)
            .or_else(|| users.values().find(|u| u.phone == phone));
        Ok(found.cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate("id"));
        }
        check_unique(&users, None, &user.auth_id, &user.phone)?;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        user.refresh_token = token.map(str::to_string);
        user.updated_at = now_rfc3339();
        Ok(())
    }

    async fn rebind_identity(
        &self,
        id: &str,
        auth_id: &str,
        phone: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, Some(id), auth_id, phone)?;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        user.auth_id = auth_id.to_string();
        user.phone = phone.to_string();
        user.updated_at = now_rfc3339();
        Ok(user.clone())
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply(user, &now_rfc3339());
        Ok(user.clone())
    }
}
