//! Typed view over the device key-value store.
//!
//! Key scheme:
//!
//! | key | value |
//! |-----|-------|
//! | `diy_current_user` | signed-in `UserProfile` |
//! | `auth_token` | bearer token (raw string) |
//! | `progress_{email}_{tutorialId}` | [`CachedProgress`] |
//! | `learning_{email}` | list of [`LearningEntry`] |
//! | `app_theme` | `"light"` or `"dark"` (raw string) |

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use diy_core::model::{LearningStatus, Progress, Theme, TutorialId, UserProfile};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::repository::{InMemoryRepository, KeyValueStore, StorageError};

pub const CURRENT_USER_KEY: &str = "diy_current_user";
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const THEME_KEY: &str = "app_theme";

#[must_use]
pub fn progress_key(email: &str, tutorial_id: &TutorialId) -> String {
    format!("progress_{email}_{tutorial_id}")
}

#[must_use]
pub fn learning_key(email: &str) -> String {
    format!("learning_{email}")
}

/// Locally cached step progress for one (user, tutorial) pair.
///
/// `version` increases with every local write; `synced` tells whether the
/// backend has acknowledged the write carrying that version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProgress {
    #[serde(default = "first_step")]
    pub current_step: u32,
    #[serde(default)]
    pub completed_steps: BTreeSet<u32>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub synced: bool,
}

fn first_step() -> u32 {
    1
}

impl CachedProgress {
    #[must_use]
    pub fn into_progress(self, tutorial_id: TutorialId, total_steps: Option<u32>) -> Progress {
        let is_completed = total_steps
            .is_some_and(|n| n > 0 && (1..=n).all(|s| self.completed_steps.contains(&s)));
        Progress {
            tutorial_id,
            current_step: self.current_step.max(1),
            completed_steps: self.completed_steps,
            is_completed,
            time_spent_secs: 0,
        }
    }
}

/// One tutorial the learner has opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningEntry {
    pub tutorial_id: TutorialId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LearningEntry {
    #[must_use]
    pub fn status(&self) -> LearningStatus {
        if self.completed {
            LearningStatus::Completed
        } else {
            LearningStatus::Ongoing
        }
    }
}

/// Typed access to the device store. Cheap to clone.
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    #[must_use]
    pub fn raw(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("{key}: {e}")))
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(format!("{key}: {e}")))?;
        self.kv.set(key, &raw).await
    }

    // ─── Session ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    pub async fn current_user(&self) -> Result<Option<UserProfile>, StorageError> {
        self.get_json(CURRENT_USER_KEY).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    pub async fn save_current_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        self.set_json(CURRENT_USER_KEY, user).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn auth_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.kv.get(AUTH_TOKEN_KEY).await?.filter(|t| !t.is_empty()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the token cannot be stored.
    pub async fn save_auth_token(&self, token: &str) -> Result<(), StorageError> {
        self.kv.set(AUTH_TOKEN_KEY, token).await
    }

    /// Forget the signed-in user and their token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either key cannot be removed.
    pub async fn clear_session(&self) -> Result<(), StorageError> {
        self.kv.remove(CURRENT_USER_KEY).await?;
        self.kv.remove(AUTH_TOKEN_KEY).await
    }

    // ─── Progress cache ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    pub async fn progress(
        &self,
        email: &str,
        tutorial_id: &TutorialId,
    ) -> Result<Option<CachedProgress>, StorageError> {
        self.get_json(&progress_key(email, tutorial_id)).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    pub async fn save_progress(
        &self,
        email: &str,
        tutorial_id: &TutorialId,
        progress: &CachedProgress,
    ) -> Result<(), StorageError> {
        self.set_json(&progress_key(email, tutorial_id), progress).await
    }

    // ─── Learning index ──────────────────────────────────────────────────────

    /// Tutorials the learner has opened, in the order they were first opened.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    pub async fn learning(&self, email: &str) -> Result<Vec<LearningEntry>, StorageError> {
        Ok(self.get_json(&learning_key(email)).await?.unwrap_or_default())
    }

    /// Record that the learner opened `tutorial_id`. Returns `true` when the
    /// entry is new.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the index cannot be read or written.
    pub async fn touch_learning(
        &self,
        email: &str,
        tutorial_id: &TutorialId,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut entries = self.learning(email).await?;
        if entries.iter().any(|e| &e.tutorial_id == tutorial_id) {
            return Ok(false);
        }
        entries.push(LearningEntry {
            tutorial_id: tutorial_id.clone(),
            started_at: now,
            completed: false,
            completed_at: None,
        });
        self.set_json(&learning_key(email), &entries).await?;
        Ok(true)
    }

    /// Flag `tutorial_id` as completed, adding it first if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the index cannot be read or written.
    pub async fn mark_learning_completed(
        &self,
        email: &str,
        tutorial_id: &TutorialId,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut entries = self.learning(email).await?;
        match entries.iter_mut().find(|e| &e.tutorial_id == tutorial_id) {
            Some(entry) if entry.completed => return Ok(()),
            Some(entry) => {
                entry.completed = true;
                entry.completed_at = Some(now);
            }
            None => entries.push(LearningEntry {
                tutorial_id: tutorial_id.clone(),
                started_at: now,
                completed: true,
                completed_at: Some(now),
            }),
        }
        self.set_json(&learning_key(email), &entries).await
    }

    // ─── Preferences ─────────────────────────────────────────────────────────

    /// Stored theme; unknown values read as `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn theme(&self) -> Result<Option<Theme>, StorageError> {
        Ok(self
            .kv
            .get(THEME_KEY)
            .await?
            .and_then(|raw| raw.parse().ok()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.kv.set(THEME_KEY, theme.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diy_core::time::fixed_now;

    fn user() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Test User",
            "username": "testuser",
            "email": "test@mail.com"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn session_round_trip_and_clear() {
        let store = LocalStore::in_memory();
        store.save_current_user(&user()).await.unwrap();
        store.save_auth_token("tok").await.unwrap();

        assert_eq!(store.current_user().await.unwrap(), Some(user()));
        assert_eq!(store.auth_token().await.unwrap().as_deref(), Some("tok"));

        store.clear_session().await.unwrap();
        assert_eq!(store.current_user().await.unwrap(), None);
        assert_eq!(store.auth_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn progress_uses_per_user_per_tutorial_key() {
        let repo = InMemoryRepository::new();
        let store = LocalStore::new(Arc::new(repo.clone()));
        let id = TutorialId::new("7");
        let cached = CachedProgress {
            current_step: 3,
            completed_steps: [1, 2].into_iter().collect(),
            version: 4,
            synced: false,
        };
        store.save_progress("a@b.c", &id, &cached).await.unwrap();

        assert_eq!(repo.keys().unwrap(), vec!["progress_a@b.c_7".to_string()]);
        assert_eq!(store.progress("a@b.c", &id).await.unwrap(), Some(cached));
        assert_eq!(store.progress("x@y.z", &id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn legacy_progress_records_decode() {
        let repo = InMemoryRepository::new();
        repo.set("progress_a@b.c_1", r#"{"currentStep":2,"completedSteps":[1]}"#)
            .await
            .unwrap();
        let store = LocalStore::new(Arc::new(repo));

        let cached = store
            .progress("a@b.c", &TutorialId::new("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.version, 0);
        assert!(!cached.synced);

        let progress = cached.into_progress(TutorialId::new("1"), Some(1));
        assert!(progress.is_completed);
        assert_eq!(progress.current_step, 2);
    }

    #[tokio::test]
    async fn learning_index_touch_and_complete() {
        let store = LocalStore::in_memory();
        let id = TutorialId::new("1");
        assert!(store.touch_learning("a@b.c", &id, fixed_now()).await.unwrap());
        assert!(!store.touch_learning("a@b.c", &id, fixed_now()).await.unwrap());

        store
            .mark_learning_completed("a@b.c", &id, fixed_now())
            .await
            .unwrap();
        store
            .mark_learning_completed("a@b.c", &TutorialId::new("2"), fixed_now())
            .await
            .unwrap();

        let entries = store.learning("a@b.c").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status() == LearningStatus::Completed));
        assert_eq!(entries[0].completed_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn theme_defaults_to_none_and_ignores_garbage() {
        let repo = InMemoryRepository::new();
        let store = LocalStore::new(Arc::new(repo.clone()));
        assert_eq!(store.theme().await.unwrap(), None);

        store.save_theme(Theme::Dark).await.unwrap();
        assert_eq!(store.theme().await.unwrap(), Some(Theme::Dark));

        repo.set(THEME_KEY, "neon").await.unwrap();
        assert_eq!(store.theme().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_json_is_a_serialization_error() {
        let repo = InMemoryRepository::new();
        repo.set(CURRENT_USER_KEY, "{not json").await.unwrap();
        let store = LocalStore::new(Arc::new(repo));
        assert!(matches!(
            store.current_user().await,
            Err(StorageError::Serialization(_))
        ));
    }
}
