//! REST backend client.

mod error_body;
mod http;
mod wire;

use async_trait::async_trait;
use diy_core::forms::{LoginForm, Registration};
use diy_core::model::{Difficulty, Progress, Tutorial, TutorialId, UserProfile};

use crate::error::ApiError;

pub use error_body::error_message;
pub use http::HttpApi;

/// Server-side filters for the tutorial list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

/// Returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: Option<String>,
}

/// Tutorial fields the progress endpoint populates alongside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialRef {
    pub id: TutorialId,
    pub title: String,
    pub category: String,
    pub image_url: Option<String>,
    pub total_steps: u32,
}

/// One entry of the learner's progress list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub progress: Progress,
    pub tutorial: Option<TutorialRef>,
}

/// Operations the learning backend offers this client.
///
/// Implementations keep the bearer token; every call after `set_token`
/// is authenticated.
#[async_trait]
pub trait LearningApi: Send + Sync {
    async fn login(&self, form: &LoginForm) -> Result<AuthSession, ApiError>;

    async fn register(&self, form: &Registration) -> Result<AuthSession, ApiError>;

    async fn me(&self) -> Result<UserProfile, ApiError>;

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError>;

    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError>;

    async fn user_progress(&self) -> Result<Vec<ProgressRecord>, ApiError>;

    /// `Ok(None)` when the learner has no stored progress for the tutorial.
    async fn tutorial_progress(&self, id: &TutorialId) -> Result<Option<Progress>, ApiError>;

    async fn update_progress(
        &self,
        id: &TutorialId,
        step: u32,
        completed: bool,
    ) -> Result<(), ApiError>;

    /// Add `delta_secs` to the time stored for the tutorial.
    async fn update_time_spent(&self, id: &TutorialId, delta_secs: u64) -> Result<(), ApiError>;

    fn set_token(&self, token: Option<String>);

    fn clear_token(&self) {
        self.set_token(None);
    }

    fn has_token(&self) -> bool;
}
