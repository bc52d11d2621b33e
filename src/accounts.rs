//! Sign-in and profile collaborators.
//!
//! Brewing never depends on these. A profile save produces a [`Notice`] for
//! the front end and nothing else.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AccountError, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub favorite_tea_types: Vec<String>,
    #[serde(default)]
    pub preferred_brewing_methods: Vec<String>,
    pub tea_notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn display_name_or_default(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Tea Enthusiast")
    }
}

/// The editable part of a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub tea_notes: Option<String>,
    pub favorite_tea_types: Vec<String>,
    pub preferred_brewing_methods: Vec<String>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Option<User>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AccountError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AccountError>;
    async fn sign_out(&self) -> Result<(), AccountError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Profile, AccountError>;
    async fn update(&self, user_id: &str, update: ProfileUpdate) -> Result<Profile, AccountError>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Destructive,
}

/// A short user-facing message, the CLI analogue of a toast.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub kind: NoticeKind,
}

pub fn save_profile_notice(result: &Result<Profile, AccountError>) -> Notice {
    match result {
        Ok(_) => Notice {
            title: "Profile updated! 🌿".into(),
            description: "Your tea preferences have been saved.".into(),
            kind: NoticeKind::Success,
        },
        Err(err) => {
            log_warn!("[accounts] profile update failed: {}", err);
            Notice {
                title: "Update failed".into(),
                description: "Failed to update your profile. Please try again.".into(),
                kind: NoticeKind::Destructive,
            }
        }
    }
}

/// Saves the signed-in user's profile and reports the outcome as a notice.
pub async fn save_profile(
    auth: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    update: ProfileUpdate,
) -> Notice {
    let result = match auth.current_user().await {
        Some(user) => profiles.update(&user.id, update).await,
        None => Err(AccountError::SignedOut),
    };
    save_profile_notice(&result)
}

/// In-process accounts for tests and offline runs.
#[derive(Default)]
pub struct MemoryAccounts {
    user: Mutex<Option<User>>,
    /// email → (password, user)
    credentials: Mutex<HashMap<String, (String, User)>>,
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryAccounts {
    pub fn signed_in(user: User) -> Self {
        let accounts = Self::default();
        accounts.register(user.clone(), String::new());
        *accounts.user_guard() = Some(user);
        accounts
    }

    fn register(&self, user: User, password: String) {
        self.profiles_guard().insert(
            user.id.clone(),
            Profile {
                id: user.id.clone(),
                ..Profile::default()
            },
        );
        lock(&self.credentials).insert(user.email.clone(), (password, user));
    }

    fn user_guard(&self) -> MutexGuard<'_, Option<User>> {
        lock(&self.user)
    }

    fn profiles_guard(&self) -> MutexGuard<'_, HashMap<String, Profile>> {
        lock(&self.profiles)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl AuthProvider for MemoryAccounts {
    async fn current_user(&self) -> Option<User> {
        self.user_guard().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = match lock(&self.credentials).get(email) {
            Some((stored, user)) if stored == password => user.clone(),
            _ => return Err(AccountError::InvalidCredentials),
        };
        *self.user_guard() = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AccountError> {
        if lock(&self.credentials).contains_key(email) {
            return Err(AccountError::AlreadyRegistered(email.to_string()));
        }
        let user = User {
            id: format!("user-{}", Uuid::new_v4().simple()),
            email: email.to_string(),
        };
        self.register(user.clone(), password.to_string());
        *self.user_guard() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AccountError> {
        self.user_guard().take().map(|_| ()).ok_or(AccountError::SignedOut)
    }
}

#[async_trait]
impl ProfileStore for MemoryAccounts {
    async fn fetch(&self, user_id: &str) -> Result<Profile, AccountError> {
        self.profiles_guard()
            .get(user_id)
            .cloned()
            .ok_or_else(|| AccountError::ProfileNotFound(user_id.to_string()))
    }

    async fn update(&self, user_id: &str, update: ProfileUpdate) -> Result<Profile, AccountError> {
        let mut profiles = self.profiles_guard();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| AccountError::ProfileNotFound(user_id.to_string()))?;
        profile.display_name = update.display_name;
        profile.tea_notes = update.tea_notes;
        profile.favorite_tea_types = update.favorite_tea_types;
        profile.preferred_brewing_methods = update.preferred_brewing_methods;
        profile.updated_at = Some(Utc::now());
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn user() -> User {
        User {
            id: "u-1".into(),
            email: "leaf@example.com".into(),
        }
    }

    #[tokio::test]
    async fn save_reports_success_and_persists() {
        let accounts = MemoryAccounts::signed_in(user());
        let update = ProfileUpdate {
            display_name: Some("Leaf".into()),
            favorite_tea_types: vec!["Oolong".into()],
            ..ProfileUpdate::default()
        };

        let notice = save_profile(&accounts, &accounts, update).await;
        assert_eq!(notice.kind, NoticeKind::Success);

        let profile = accounts.fetch("u-1").await.unwrap();
        assert_eq!(profile.display_name_or_default(), "Leaf");
        assert_eq!(profile.favorite_tea_types, vec!["Oolong".to_string()]);
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn signed_out_save_is_destructive_notice() {
        let accounts = MemoryAccounts::signed_in(user());
        accounts.sign_out().await.unwrap();
        assert_matches!(accounts.sign_out().await, Err(AccountError::SignedOut));

        let notice = save_profile(&accounts, &accounts, ProfileUpdate::default()).await;
        assert_eq!(notice.kind, NoticeKind::Destructive);
        assert_eq!(notice.title, "Update failed");
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let accounts = MemoryAccounts::default();
        assert_eq!(accounts.current_user().await, None);

        let user = accounts.sign_up("new@example.com", "oolong").await.unwrap();
        assert!(user.id.starts_with("user-"));
        assert_matches!(
            accounts.sign_up("new@example.com", "again").await,
            Err(AccountError::AlreadyRegistered(_))
        );
        assert!(accounts.fetch(&user.id).await.is_ok());

        accounts.sign_out().await.unwrap();
        assert_matches!(
            accounts.sign_in("new@example.com", "wrong").await,
            Err(AccountError::InvalidCredentials)
        );
        let back = accounts.sign_in("new@example.com", "oolong").await.unwrap();
        assert_eq!(back, user);
        assert_eq!(accounts.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn unknown_profile() {
        let accounts = MemoryAccounts::default();
        assert_matches!(
            accounts.fetch("nobody").await,
            Err(AccountError::ProfileNotFound(id)) if id == "nobody"
        );
        assert_eq!(Profile::default().display_name_or_default(), "Tea Enthusiast");
    }
}
