// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`UserStore`].
//!
//! Firestore has no unique indexes, so each user owns two claim documents,
//! `user_auth_ids/{authId}` and `user_phones/{phone}`. Claims are written in
//! the same transaction as the user with an "must not exist" precondition;
//! a second user racing for the same phone fails the commit.

use crate::db::{collections, StoreError, UserStore};
use crate::models::{ProfileUpdate, User};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreTransaction, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

/// Claim document pointing back at the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityClaim {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    async fn begin(&self) -> Result<FirestoreTransaction<'_>, StoreError> {
        self.get_client()?
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))
    }

    /// Queue creation of a claim document; the commit fails if it exists.
    fn claim(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        collection: &str,
        key: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let claim = IdentityClaim {
            user_id: user_id.to_string(),
        };
        self.get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(claim_id(key))
            .object(&claim)
            .add_to_transaction(transaction)
            .map_err(|e| StoreError::Backend(format!("Failed to add claim to transaction: {}", e)))?;
        Ok(())
    }

    /// Queue removal of a claim document.
    fn release(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        collection: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(claim_id(key))
            .add_to_transaction(transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add claim release to transaction: {}", e))
            })?;
        Ok(())
    }

    fn put_user(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        user: &User,
        must_be_new: bool,
    ) -> Result<(), StoreError> {
        let update = self.get_client()?.fluent().update().in_col(collections::USERS);
        let update = if must_be_new {
            update.precondition(FirestoreWritePrecondition::Exists(false))
        } else {
            update
        };
        update
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(transaction)
            .map_err(|e| StoreError::Backend(format!("Failed to add user to transaction: {}", e)))?;
        Ok(())
    }

    async fn require_user(&self, id: &str) -> Result<User, StoreError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Document IDs may not contain `/`, so keys are percent-encoded.
fn claim_id(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Fields written by a profile update. Session and identity fields are
/// never in the mask, so concurrent logins and rebinds are not undone.
fn profile_update_mask(update: &ProfileUpdate) -> Vec<&'static str> {
    let mut fields = vec![
        "fullName",
        "email",
        "role",
        "subject",
        "isProfileComplete",
        "updatedAt",
    ];
    if update.profile_pic.is_some() {
        fields.push("profilePic");
    }
    fields
}

/// A failed precondition on commit means an identity claim was taken.
fn commit_error(err: FirestoreError) -> StoreError {
    match err {
        FirestoreError::DataConflictError(_) => StoreError::Duplicate("phone or authId"),
        other => {
            let msg = other.to_string();
            if msg.contains("ALREADY_EXISTS") || msg.contains("FAILED_PRECONDITION") {
                StoreError::Duplicate("phone or authId")
            } else {
                StoreError::Backend(format!("Transaction commit failed: {}", msg))
            }
        }
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_by_auth_id_or_phone(
        &self,
        auth_id: &str,
        phone: &str,
    ) -> Result<Option<User>, StoreError> {
        let candidates: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| {
                q.for_any([
                    q.field("authId").eq(auth_id),
                    q.field("phone").eq(phone),
                ])
            })
            .limit(2)
            .obj()
            .query()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let by_auth_id = candidates.iter().position(|u| u.auth_id == auth_id);
        let mut candidates = candidates;
        Ok(match by_auth_id {
            Some(index) => Some(candidates.swap_remove(index)),
            None => candidates.into_iter().next(),
        })
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut transaction = self.begin().await?;

        self.claim(&mut transaction, collections::USER_AUTH_IDS, &user.auth_id, &user.id)?;
        self.claim(&mut transaction, collections::USER_PHONES, &user.phone, &user.id)?;
        self.put_user(&mut transaction, user, true)?;

        transaction.commit().await.map_err(commit_error)?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<(), StoreError> {
        let mut user = self.require_user(id).await?;
        user.refresh_token = token.map(str::to_string);
        user.updated_at = now_rfc3339();

        // Field mask limits the write to the session fields; an absent
        // refreshToken in the object deletes it.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["refreshToken", "updatedAt"])
            .in_col(collections::USERS)
            .document_id(id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn rebind_identity(
        &self,
        id: &str,
        auth_id: &str,
        phone: &str,
    ) -> Result<User, StoreError> {
        let mut user = self.require_user(id).await?;
        let mut transaction = self.begin().await?;

        if user.auth_id != auth_id {
            self.release(&mut transaction, collections::USER_AUTH_IDS, &user.auth_id)?;
            self.claim(&mut transaction, collections::USER_AUTH_IDS, auth_id, id)?;
        }
        if user.phone != phone {
            self.release(&mut transaction, collections::USER_PHONES, &user.phone)?;
            self.claim(&mut transaction, collections::USER_PHONES, phone, id)?;
        }

        user.auth_id = auth_id.to_string();
        user.phone = phone.to_string();
        user.updated_at = now_rfc3339();
        self.put_user(&mut transaction, &user, false)?;

        transaction.commit().await.map_err(commit_error)?;

        tracing::info!(user_id = %id, "User identity rebound");
        Ok(user)
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut user = self.require_user(id).await?;
        update.apply(&mut user, &now_rfc3339());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(profile_update_mask(update))
            .in_col(collections::USERS)
            .document_id(id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(user)
    }
}
