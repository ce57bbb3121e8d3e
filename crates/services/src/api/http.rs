use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use diy_core::forms::{LoginForm, Registration};
use diy_core::model::{Progress, Tutorial, TutorialId, UserProfile};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::api::error_body::error_message;
use crate::api::{wire, AuthSession, LearningApi, ProgressRecord, TutorialFilter};
use crate::config::ApiConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpApi {
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn tutorial_url(&self, id: &TutorialId, suffix: &str) -> Result<Url, ApiError> {
        Ok(self.config.endpoint(&format!("/tutorials/{id}{suffix}"))?)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        debug!(%method, %url, "api request");
        let mut request = self.client.request(method, url);
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let payload = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            return Ok(payload);
        }

        let message = error_message(&payload);
        debug!(status = status.as_u16(), %message, "api error");
        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            other => ApiError::Status {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn get(&self, url: Url) -> Result<Value, ApiError> {
        self.send::<Value>(Method::GET, url, None).await
    }

    async fn post<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<Value, ApiError> {
        self.send(Method::POST, url, Some(body)).await
    }
}

#[async_trait]
impl LearningApi for HttpApi {
    async fn login(&self, form: &LoginForm) -> Result<AuthSession, ApiError> {
        let body = self.post(self.config.endpoint("/auth/login")?, form).await?;
        let session = wire::auth_session(body)?;
        if session.token.is_some() {
            self.set_token(session.token.clone());
        }
        Ok(session)
    }

    async fn register(&self, form: &Registration) -> Result<AuthSession, ApiError> {
        let body = self
            .post(self.config.endpoint("/auth/register")?, form)
            .await?;
        let session = wire::auth_session(body)?;
        if session.token.is_some() {
            self.set_token(session.token.clone());
        }
        Ok(session)
    }

    async fn me(&self) -> Result<UserProfile, ApiError> {
        let body = self.get(self.config.endpoint("/auth/me")?).await?;
        wire::user(body)
    }

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError> {
        let mut url = self.config.endpoint("/tutorials")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = &filter.category {
                pairs.append_pair("category", category);
            }
            if let Some(difficulty) = filter.difficulty {
                pairs.append_pair("difficulty", difficulty.label());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        wire::tutorials(self.get(url).await?)
    }

    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError> {
        wire::tutorial(self.get(self.tutorial_url(id, "")?).await?)
    }

    async fn user_progress(&self) -> Result<Vec<ProgressRecord>, ApiError> {
        let body = self
            .get(self.config.endpoint("/tutorials/user/progress")?)
            .await?;
        wire::progress_records(body)
    }

    async fn tutorial_progress(&self, id: &TutorialId) -> Result<Option<Progress>, ApiError> {
        let body = self.get(self.tutorial_url(id, "/progress")?).await?;
        wire::tutorial_progress(body, id)
    }

    async fn update_progress(
        &self,
        id: &TutorialId,
        step: u32,
        completed: bool,
    ) -> Result<(), ApiError> {
        let payload = json!({ "stepNumber": step, "completed": completed });
        self.post(self.tutorial_url(id, "/progress")?, &payload)
            .await?;
        Ok(())
    }

    async fn update_time_spent(&self, id: &TutorialId, delta_secs: u64) -> Result<(), ApiError> {
        let payload = json!({ "timeSpent": delta_secs });
        self.post(self.tutorial_url(id, "/time")?, &payload).await?;
        Ok(())
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    fn has_token(&self) -> bool {
        self.bearer().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let api = HttpApi::new(ApiConfig::new("http://localhost:5000/api").unwrap()).unwrap();
        assert!(!api.has_token());
        api.set_token(Some("jwt".into()));
        assert!(api.has_token());
        api.clear_token();
        assert!(!api.has_token());
    }

    #[test]
    fn tutorial_urls_nest_under_base() {
        let api = HttpApi::new(ApiConfig::new("https://example.test/api/").unwrap()).unwrap();
        let id = TutorialId::new("abc123");
        assert_eq!(
            api.tutorial_url(&id, "/progress").unwrap().as_str(),
            "https://example.test/api/tutorials/abc123/progress"
        );
    }
}
