// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test uses fresh identifiers so
//! runs do not interfere with each other.

use phone_auth_api::db::{StoreError, UserStore};
use phone_auth_api::models::{ProfileUpdate, Role, User};
use phone_auth_api::services::ids::new_user_id;

mod common;
use common::test_db;

/// Fresh user with unique auth ID and phone.
fn unique_user() -> User {
    let id = new_user_id().unwrap();
    User::new(
        id.clone(),
        &format!("auth-{id}"),
        &format!("+1{}", &id[..10]),
        "2026-01-01T00:00:00.000Z",
    )
}

#[tokio::test]
async fn test_create_and_find_user() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();

    assert!(db.find_by_id(&user.id).await.unwrap().is_none());

    db.create(&user).await.unwrap();

    let fetched = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(fetched, user);

    let by_phone = db
        .find_by_auth_id_or_phone("auth-unknown", &user.phone)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_phone.id, user.id);

    let by_auth = db
        .find_by_auth_id_or_phone(&user.auth_id, "+10000000000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_auth.id, user.id);
}

#[tokio::test]
async fn test_duplicate_phone_rejected() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();
    db.create(&user).await.unwrap();

    let mut twin = unique_user();
    twin.phone = user.phone.clone();

    let err = db.create(&twin).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)), "got {err:?}");
    assert!(db.find_by_id(&twin.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_token_set_and_cleared() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();
    db.create(&user).await.unwrap();

    db.set_refresh_token(&user.id, Some("token-1")).await.unwrap();
    let stored = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("token-1"));

    db.set_refresh_token(&user.id, None).await.unwrap();
    let stored = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_update_profile_marks_complete() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();
    db.create(&user).await.unwrap();

    let update = ProfileUpdate {
        full_name: "Ada Lovelace".to_string(),
        email: None,
        role: Some(Role::Teacher),
        subject: None,
        profile_pic: None,
    };
    let updated = db.update_profile(&user.id, &update).await.unwrap();
    assert!(updated.is_profile_complete);

    let stored = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Ada Lovelace");
    assert_eq!(stored.role, Role::Teacher);
}

#[tokio::test]
async fn test_rebind_moves_claims() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();
    db.create(&user).await.unwrap();

    let new_auth = format!("{}-moved", user.auth_id);
    let rebound = db
        .rebind_identity(&user.id, &new_auth, &user.phone)
        .await
        .unwrap();
    assert_eq!(rebound.auth_id, new_auth);

    // The old auth ID is free again
    let mut other = unique_user();
    other.auth_id = user.auth_id.clone();
    db.create(&other).await.unwrap();
}

#[tokio::test]
async fn test_update_profile_leaves_session_and_identity() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user();
    db.create(&user).await.unwrap();
    db.set_refresh_token(&user.id, Some("token-2")).await.unwrap();

    let update = ProfileUpdate {
        full_name: "Grace".to_string(),
        email: Some("grace@example.com".to_string()),
        role: None,
        subject: None,
        profile_pic: None,
    };
    db.update_profile(&user.id, &update).await.unwrap();

    let stored = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("token-2"));
    assert_eq!(stored.auth_id, user.auth_id);
    assert_eq!(stored.phone, user.phone);
    assert_eq!(stored.email, "grace@example.com");
}
