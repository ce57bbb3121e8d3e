use std::sync::Arc;

use diy_core::model::TutorialId;
use storage::LocalStore;

use crate::api::{HttpApi, LearningApi};
use crate::catalog::CatalogService;
use crate::config::ApiConfig;
use crate::error::{AppServicesError, TutorialSessionError};
use crate::my_learning::MyLearningService;
use crate::progress_sync::ProgressSync;
use crate::session::SessionContext;
use crate::settings::SettingsService;
use crate::tutorial_session::TutorialSession;
use crate::Clock;

/// Assembles app-facing services around one API client and one store.
#[derive(Clone)]
pub struct AppServices {
    api: Arc<dyn LearningApi>,
    session: SessionContext,
    catalog: Arc<CatalogService>,
    progress: ProgressSync,
    my_learning: Arc<MyLearningService>,
    settings: Arc<SettingsService>,
}

impl AppServices {
    #[must_use]
    pub fn new(api: Arc<dyn LearningApi>, store: LocalStore, clock: Clock) -> Self {
        Self {
            session: SessionContext::new(Arc::clone(&api), store.clone()),
            catalog: Arc::new(CatalogService::new(Arc::clone(&api), store.clone())),
            progress: ProgressSync::new(Arc::clone(&api), store.clone(), clock),
            my_learning: Arc::new(MyLearningService::new(Arc::clone(&api), store.clone())),
            settings: Arc::new(SettingsService::new(store)),
            api,
        }
    }

    /// Build services against the HTTP backend and restore any stored
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Api` if the HTTP client cannot be built.
    pub async fn http(
        config: ApiConfig,
        store: LocalStore,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let api: Arc<dyn LearningApi> = Arc::new(HttpApi::new(config)?);
        let services = Self::new(api, store, clock);
        services.session.restore().await;
        Ok(services)
    }

    /// Same as [`AppServices::http`] with `SQLite`-backed local storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or client setup
    /// fails.
    pub async fn sqlite(
        config: ApiConfig,
        db_url: &str,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let store = LocalStore::sqlite(db_url).await?;
        Self::http(config, store, clock).await
    }

    /// Open the detail session for the signed-in learner.
    ///
    /// # Errors
    ///
    /// Returns `TutorialSessionError::NotSignedIn` without a session, or the
    /// error from [`TutorialSession::open`].
    pub async fn open_tutorial(
        &self,
        id: &TutorialId,
    ) -> Result<TutorialSession, TutorialSessionError> {
        let user = self
            .session
            .current_user()
            .ok_or(TutorialSessionError::NotSignedIn)?;
        TutorialSession::open(
            &self.catalog,
            &self.progress,
            Arc::clone(&self.api),
            &user,
            id,
        )
        .await
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn LearningApi> {
        Arc::clone(&self.api)
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressSync {
        &self.progress
    }

    #[must_use]
    pub fn my_learning(&self) -> Arc<MyLearningService> {
        Arc::clone(&self.my_learning)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }
}
