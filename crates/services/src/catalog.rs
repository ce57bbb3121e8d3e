use std::collections::HashMap;
use std::sync::Arc;

use diy_core::catalog::{self, CatalogQuery, StatusLookup};
use diy_core::model::{LearningStatus, Tutorial, TutorialId, UserProfile};
use storage::LocalStore;
use tracing::warn;

use crate::api::{LearningApi, TutorialFilter};
use crate::error::{ApiError, CatalogError};

/// Tutorial list and detail lookups.
#[derive(Clone)]
pub struct CatalogService {
    api: Arc<dyn LearningApi>,
    store: LocalStore,
}

impl CatalogService {
    #[must_use]
    pub fn new(api: Arc<dyn LearningApi>, store: LocalStore) -> Self {
        Self { api, store }
    }

    /// Fetch tutorials and apply the home-screen query.
    ///
    /// Category and difficulty are also sent to the backend; search, the
    /// progress filter and sorting run locally. The progress filter only
    /// applies when `user` is signed in.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Api` if the list cannot be fetched.
    pub async fn list(
        &self,
        query: &CatalogQuery,
        user: Option<&UserProfile>,
    ) -> Result<Vec<Tutorial>, CatalogError> {
        let filter = TutorialFilter {
            category: query.selected_category().map(str::to_owned),
            difficulty: query.difficulty,
        };
        let tutorials = self.api.list_tutorials(&filter).await?;

        let statuses: StatusLookup = match user {
            Some(user) => Some(self.statuses(&user.email).await),
            None => None,
        };
        Ok(catalog::apply(&tutorials, query, &statuses)
            .into_iter()
            .cloned()
            .collect())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` when the backend has no such
    /// tutorial, `CatalogError::Api` for other failures.
    pub async fn tutorial(&self, id: &TutorialId) -> Result<Tutorial, CatalogError> {
        match self.api.get_tutorial(id).await {
            Ok(tutorial) => Ok(tutorial),
            Err(ApiError::NotFound(_)) => Err(CatalogError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Learning status per tutorial from the local index. Unreadable
    /// indexes count as empty.
    pub async fn statuses(&self, email: &str) -> HashMap<TutorialId, LearningStatus> {
        match self.store.learning(email).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| {
                    let status = entry.status();
                    (entry.tutorial_id, status)
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "learning index unreadable");
                HashMap::new()
            }
        }
    }
}
