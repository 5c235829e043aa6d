// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role a user plays in the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Teacher,
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a role string outside `TEACHER`/`STUDENT`/`ADMIN`.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Role must be one of TEACHER, STUDENT, ADMIN")]
pub struct InvalidRole;

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "TEACHER" => Ok(Role::Teacher),
            "STUDENT" => Ok(Role::Student),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(InvalidRole),
        }
    }
}

/// User record stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Random 24-character hex ID (also used as document ID)
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier from the external phone-auth provider
    pub auth_id: String,
    pub phone: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    /// Hosted profile picture URL
    #[serde(default)]
    pub profile_pic: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub is_profile_complete: bool,
    /// Currently valid refresh token, if the user has an active session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// A freshly signed-up user with an incomplete profile.
    pub fn new(id: String, auth_id: &str, phone: &str, now: &str) -> Self {
        Self {
            id,
            auth_id: auth_id.to_string(),
            phone: phone.to_string(),
            full_name: String::new(),
            email: String::new(),
            profile_pic: String::new(),
            role: Role::Student,
            subject: String::new(),
            is_profile_complete: false,
            refresh_token: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// User as returned by the API. Never carries the refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub auth_id: String,
    pub phone: String,
    pub full_name: String,
    pub email: String,
    pub profile_pic: String,
    pub role: Role,
    pub subject: String,
    pub is_profile_complete: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            auth_id: user.auth_id,
            phone: user.phone,
            full_name: user.full_name,
            email: user.email,
            profile_pic: user.profile_pic,
            role: user.role,
            subject: user.subject,
            is_profile_complete: user.is_profile_complete,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Validated profile update.
///
/// Each optional field has a fixed effect when absent:
/// - `email`: stored email is cleared to `""`
/// - `role`: stored role is reset to `STUDENT`
/// - `subject`: stored subject is cleared to `""`
/// - `profile_pic`: stored picture is kept
///
/// Applying an update always marks the profile complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub subject: Option<String>,
    pub profile_pic: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, user: &mut User, now: &str) {
        user.full_name = self.full_name.clone();
        user.email = self.email.clone().unwrap_or_default();
        user.role = self.role.unwrap_or_default();
        user.subject = self.subject.clone().unwrap_or_default();
        if let Some(url) = &self.profile_pic {
            user.profile_pic = url.clone();
        }
        user.is_profile_complete = true;
        user.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing_user() -> User {
        let mut user = User::new(
            "65a1b2c3d4e5f60718293a4b".to_string(),
            "auth-abc",
            "+15551234567",
            "2026-01-01T00:00:00Z",
        );
        user.email = "old@example.com".to_string();
        user.role = Role::Teacher;
        user.subject = "Physics".to_string();
        user.profile_pic = "https://img.example.com/old.png".to_string();
        user
    }

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("id".into(), "auth", "+1555", "2026-01-01T00:00:00Z");
        assert_eq!(user.role, Role::Student);
        assert!(!user.is_profile_complete);
        assert!(user.refresh_token.is_none());
        assert_eq!(user.full_name, "");
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"TEACHER\"");
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("student".parse::<Role>(), Err(InvalidRole));
    }

    #[test]
    fn test_update_with_only_name_resets_optional_fields() {
        let mut user = existing_user();
        let update = ProfileUpdate {
            full_name: "Ada Lovelace".to_string(),
            email: None,
            role: None,
            subject: None,
            profile_pic: None,
        };

        update.apply(&mut user, "2026-02-01T00:00:00Z");

        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.email, "");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.subject, "");
        assert_eq!(user.profile_pic, "https://img.example.com/old.png");
        assert!(user.is_profile_complete);
        assert_eq!(user.updated_at, "2026-02-01T00:00:00Z");
        assert_eq!(user.created_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_update_with_all_fields() {
        let mut user = existing_user();
        let update = ProfileUpdate {
            full_name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            role: Some(Role::Admin),
            subject: Some("Maths".to_string()),
            profile_pic: Some("https://img.example.com/new.png".to_string()),
        };

        update.apply(&mut user, "2026-02-01T00:00:00Z");

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.subject, "Maths");
        assert_eq!(user.profile_pic, "https://img.example.com/new.png");
    }

    #[test]
    fn test_response_omits_refresh_token() {
        let mut user = existing_user();
        user.refresh_token = Some("secret-refresh".to_string());

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["_id"], "65a1b2c3d4e5f60718293a4b");
        assert_eq!(json["isProfileComplete"], false);
        assert_eq!(json["role"], "TEACHER");
    }
}
