#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use diy_core::forms::{LoginForm, Registration};
use diy_core::model::{Difficulty, MediaType, Progress, Step, Tutorial, TutorialId, UserProfile};
use services::api::{AuthSession, ProgressRecord};
use services::{ApiError, LearningApi, TutorialFilter};

pub const EMAIL: &str = "budi@mail.com";

pub fn user() -> UserProfile {
    UserProfile {
        id: None,
        name: "Budi Santoso".into(),
        username: "budi".into(),
        email: EMAIL.into(),
        karang_taruna_name: Some("Karang Taruna Melati".into()),
        address: None,
        phone: None,
        interests: Vec::new(),
        skill_level: None,
        role: None,
    }
}

pub fn tutorial(id: &str, title: &str, steps: u32) -> Tutorial {
    Tutorial {
        id: TutorialId::new(id),
        title: title.into(),
        description: format!("Panduan {title}"),
        category: "Plambing".into(),
        difficulty: Difficulty::Pemula,
        duration: "15 menit".into(),
        media_type: MediaType::Video,
        image_url: None,
        tools: vec!["Kunci pipa".into()],
        steps: (1..=steps)
            .map(|n| Step {
                number: n,
                title: format!("Langkah {n}"),
                content: format!("Isi langkah {n}"),
                ..Step::default()
            })
            .collect(),
        created_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).single(),
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "Service unavailable".into(),
    }
}

/// In-process backend double. Every call is recorded.
#[derive(Default)]
pub struct FakeApi {
    offline: AtomicBool,
    tutorials: Mutex<Vec<Tutorial>>,
    remote_progress: Mutex<HashMap<TutorialId, Progress>>,
    user_records: Mutex<Vec<ProgressRecord>>,
    auth_error: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
    login_calls: Mutex<Vec<LoginForm>>,
    progress_calls: Mutex<Vec<(TutorialId, u32, bool)>>,
    time_calls: Mutex<Vec<u64>>,
    failing_time_calls: Mutex<HashSet<usize>>,
}

impl FakeApi {
    pub fn with_tutorials(tutorials: Vec<Tutorial>) -> Self {
        let api = Self::default();
        *api.tutorials.lock().unwrap() = tutorials;
        api
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_remote_progress(&self, progress: Progress) {
        self.remote_progress
            .lock()
            .unwrap()
            .insert(progress.tutorial_id.clone(), progress);
    }

    pub fn set_user_records(&self, records: Vec<ProgressRecord>) {
        *self.user_records.lock().unwrap() = records;
    }

    pub fn reject_auth(&self, message: &str) {
        *self.auth_error.lock().unwrap() = Some(message.into());
    }

    /// Make the `index`-th time flush (0-based) fail.
    pub fn fail_time_call(&self, index: usize) {
        self.failing_time_calls.lock().unwrap().insert(index);
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.lock().unwrap().len()
    }

    pub fn progress_calls(&self) -> Vec<(TutorialId, u32, bool)> {
        self.progress_calls.lock().unwrap().clone()
    }

    pub fn time_calls(&self) -> Vec<u64> {
        self.time_calls.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn authenticate(&self, email: &str, name: &str, username: &str) -> Result<AuthSession, ApiError> {
        self.check_online()?;
        if let Some(message) = self.auth_error.lock().unwrap().clone() {
            return Err(ApiError::Status {
                status: 400,
                message,
            });
        }
        let token = format!("token-{username}");
        self.set_token(Some(token.clone()));
        Ok(AuthSession {
            user: UserProfile {
                email: email.into(),
                name: name.into(),
                username: username.into(),
                ..user()
            },
            token: Some(token),
        })
    }
}

#[async_trait]
impl LearningApi for FakeApi {
    async fn login(&self, form: &LoginForm) -> Result<AuthSession, ApiError> {
        self.login_calls.lock().unwrap().push(form.clone());
        self.authenticate(&form.email, "Budi Santoso", "budi")
    }

    async fn register(&self, form: &Registration) -> Result<AuthSession, ApiError> {
        self.authenticate(&form.email, &form.name, &form.username)
    }

    async fn me(&self) -> Result<UserProfile, ApiError> {
        self.check_online()?;
        if self.token().is_none() {
            return Err(ApiError::Unauthorized("Not authorized".into()));
        }
        Ok(user())
    }

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError> {
        self.check_online()?;
        Ok(self
            .tutorials
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.category.as_ref().is_none_or(|c| &t.category == c))
            .filter(|t| filter.difficulty.is_none_or(|d| t.difficulty == d))
            .cloned()
            .collect())
    }

    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError> {
        self.check_online()?;
        self.tutorials
            .lock()
            .unwrap()
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Tutorial not found".into()))
    }

    async fn user_progress(&self) -> Result<Vec<ProgressRecord>, ApiError> {
        self.check_online()?;
        Ok(self.user_records.lock().unwrap().clone())
    }

    async fn tutorial_progress(&self, id: &TutorialId) -> Result<Option<Progress>, ApiError> {
        self.check_online()?;
        Ok(self.remote_progress.lock().unwrap().get(id).cloned())
    }

    async fn update_progress(
        &self,
        id: &TutorialId,
        step: u32,
        completed: bool,
    ) -> Result<(), ApiError> {
        self.check_online()?;
        self.progress_calls
            .lock()
            .unwrap()
            .push((id.clone(), step, completed));
        Ok(())
    }

    async fn update_time_spent(&self, _id: &TutorialId, delta_secs: u64) -> Result<(), ApiError> {
        let index = {
            let mut calls = self.time_calls.lock().unwrap();
            calls.push(delta_secs);
            calls.len() - 1
        };
        self.check_online()?;
        if self.failing_time_calls.lock().unwrap().contains(&index) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}
