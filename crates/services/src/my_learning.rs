use std::sync::Arc;

use diy_core::model::{Progress, TutorialId, UserProfile};
use storage::LocalStore;
use tracing::warn;

use crate::api::{LearningApi, ProgressRecord, TutorialRef};
use crate::error::MyLearningError;

/// One card on the My Learning screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningCard {
    pub tutorial_id: TutorialId,
    pub title: String,
    pub category: String,
    pub image_url: Option<String>,
    pub percentage: u8,
    pub completed_count: u32,
    pub total_steps: u32,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearningOverview {
    pub ongoing: Vec<LearningCard>,
    pub completed: Vec<LearningCard>,
}

impl LearningOverview {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ongoing.is_empty() && self.completed.is_empty()
    }

    fn push(&mut self, card: LearningCard) {
        if card.is_completed {
            self.completed.push(card);
        } else {
            self.ongoing.push(card);
        }
    }
}

#[derive(Clone)]
pub struct MyLearningService {
    api: Arc<dyn LearningApi>,
    store: LocalStore,
}

impl MyLearningService {
    #[must_use]
    pub fn new(api: Arc<dyn LearningApi>, store: LocalStore) -> Self {
        Self { api, store }
    }

    /// Ongoing and completed tutorials for `user`.
    ///
    /// Uses the backend's progress list when reachable, otherwise the local
    /// learning index and cached progress.
    ///
    /// # Errors
    ///
    /// Returns `MyLearningError::Storage` only when the backend is
    /// unreachable and the local index cannot be read either.
    pub async fn overview(&self, user: &UserProfile) -> Result<LearningOverview, MyLearningError> {
        match self.api.user_progress().await {
            Ok(records) => Ok(self.from_records(records).await),
            Err(err) => {
                warn!(error = %err, "progress list unavailable; using local index");
                self.from_local(user).await
            }
        }
    }

    async fn from_records(&self, records: Vec<ProgressRecord>) -> LearningOverview {
        let mut overview = LearningOverview::default();
        for ProgressRecord { progress, tutorial } in records {
            let tutorial = match tutorial {
                Some(tutorial) => Some(tutorial),
                None => self.lookup(&progress.tutorial_id).await,
            };
            overview.push(card(&progress, tutorial));
        }
        overview
    }

    async fn from_local(&self, user: &UserProfile) -> Result<LearningOverview, MyLearningError> {
        let entries = self.store.learning(&user.email).await?;
        let mut overview = LearningOverview::default();
        for entry in entries {
            let tutorial = self.lookup(&entry.tutorial_id).await;
            let total = tutorial.as_ref().map(|t| t.total_steps);
            let mut progress = match self.store.progress(&user.email, &entry.tutorial_id).await {
                Ok(Some(cached)) => cached.into_progress(entry.tutorial_id.clone(), total),
                Ok(None) => Progress::fresh(entry.tutorial_id.clone()),
                Err(err) => {
                    warn!(tutorial = %entry.tutorial_id, error = %err, "progress cache unreadable");
                    Progress::fresh(entry.tutorial_id.clone())
                }
            };
            progress.is_completed |= entry.completed;
            overview.push(card(&progress, tutorial));
        }
        Ok(overview)
    }

    async fn lookup(&self, id: &TutorialId) -> Option<TutorialRef> {
        match self.api.get_tutorial(id).await {
            Ok(tutorial) => Some(TutorialRef {
                id: tutorial.id.clone(),
                total_steps: tutorial.total_steps(),
                title: tutorial.title,
                category: tutorial.category,
                image_url: tutorial.image_url,
            }),
            Err(err) => {
                warn!(tutorial = %id, error = %err, "tutorial details unavailable");
                None
            }
        }
    }
}

fn card(progress: &Progress, tutorial: Option<TutorialRef>) -> LearningCard {
    let (title, category, image_url, total_steps) = match tutorial {
        Some(t) => (t.title, t.category, t.image_url, t.total_steps),
        None => (progress.tutorial_id.to_string(), String::new(), None, 0),
    };
    // Without tutorial details there is no range to check against.
    let completed_count = if total_steps == 0 {
        progress.completed_count()
    } else {
        progress.completed_within(total_steps)
    };
    let is_completed = progress.is_completed || progress.all_steps_done(total_steps);
    let percentage = if is_completed && total_steps == 0 {
        100
    } else {
        progress.percentage(total_steps)
    };
    LearningCard {
        tutorial_id: progress.tutorial_id.clone(),
        title,
        category,
        image_url,
        percentage,
        completed_count,
        total_steps,
        is_completed,
    }
}
