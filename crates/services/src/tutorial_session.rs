//! One learner working through one tutorial.

use std::sync::Arc;

use diy_core::model::{Step, Tutorial, TutorialId, UserProfile};
use diy_core::progress::{ProgressError, StepTracker, Transition};
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

use crate::api::LearningApi;
use crate::catalog::CatalogService;
use crate::error::TutorialSessionError;
use crate::progress_sync::{PersistOutcome, ProgressSource, ProgressSync};
use crate::time_tracking::{TimeReport, TimeTrackingTask, TimerHandle};

/// What happened during a session, available after [`TutorialSession::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub time: TimeReport,
    pub persists: Vec<PersistOutcome>,
}

/// Step navigation plus the background work tied to it.
///
/// Transitions update the local cache before returning and send the remote
/// write in the background. Dropping the session without calling
/// [`TutorialSession::close`] abandons in-flight writes; the local cache
/// still holds them as unsynced.
pub struct TutorialSession {
    tutorial: Tutorial,
    email: String,
    tracker: StepTracker,
    source: ProgressSource,
    sync: ProgressSync,
    timer: TimerHandle,
    persists: JoinSet<PersistOutcome>,
    settled: Vec<PersistOutcome>,
}

impl TutorialSession {
    /// Load the tutorial and the learner's progress, register the tutorial
    /// in the learning index and start the timer.
    ///
    /// # Errors
    ///
    /// Returns `TutorialSessionError::Catalog` if the tutorial cannot be
    /// loaded (including `NotFound`), `TutorialSessionError::Progress` if
    /// it has no steps.
    pub async fn open(
        catalog: &CatalogService,
        sync: &ProgressSync,
        api: Arc<dyn LearningApi>,
        user: &UserProfile,
        id: &TutorialId,
    ) -> Result<Self, TutorialSessionError> {
        let tutorial = catalog.tutorial(id).await?;
        let loaded = sync.load(&user.email, &tutorial).await;
        let tracker = StepTracker::from_progress(&loaded.progress, tutorial.total_steps())?;

        sync.touch_learning(&user.email, &tutorial.id).await;
        if tracker.is_completed() {
            sync.mark_learning_completed(&user.email, &tutorial.id).await;
        }

        let timer =
            TimeTrackingTask::spawn(api, tutorial.id.clone(), loaded.progress.time_spent_secs);
        info!(
            tutorial = %tutorial.id,
            step = tracker.current_step(),
            source = ?loaded.source,
            "tutorial opened"
        );

        Ok(Self {
            tutorial,
            email: user.email.clone(),
            tracker,
            source: loaded.source,
            sync: sync.clone(),
            timer,
            persists: JoinSet::new(),
            settled: Vec::new(),
        })
    }

    #[must_use]
    pub fn tutorial(&self) -> &Tutorial {
        &self.tutorial
    }

    #[must_use]
    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    #[must_use]
    pub fn progress_source(&self) -> ProgressSource {
        self.source
    }

    /// Content of the step being shown.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.tutorial.step(self.tracker.current_step())
    }

    /// Seconds shown by the timer.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.timer.display()
    }

    /// Remote progress writes not yet finished.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.persists.len()
    }

    pub async fn advance(&mut self) -> Transition {
        let transition = self.tracker.advance();
        self.persist(transition).await;
        transition
    }

    pub async fn retreat(&mut self) -> Transition {
        let transition = self.tracker.retreat();
        self.persist(transition).await;
        transition
    }

    /// # Errors
    ///
    /// Returns `ProgressError::StepOutOfRange` for a step outside `1..=N`.
    pub async fn jump(&mut self, target: u32) -> Result<Transition, ProgressError> {
        let transition = self.tracker.jump(target)?;
        self.persist(transition).await;
        Ok(transition)
    }

    /// Complete the current step. `completed_now` is set on the call that
    /// completes the last missing step.
    pub async fn mark_complete(&mut self) -> Transition {
        let transition = self.tracker.mark_complete();
        if transition.completed_now {
            self.sync
                .mark_learning_completed(&self.email, &self.tutorial.id)
                .await;
            info!(tutorial = %self.tutorial.id, "tutorial completed");
        }
        self.persist(transition).await;
        transition
    }

    /// Stop the timer with a final flush and wait for pending writes.
    pub async fn close(mut self) -> SessionReport {
        let time = self.timer.stop().await;
        while let Some(done) = self.persists.join_next().await {
            record(&mut self.settled, done);
        }
        let persists = std::mem::take(&mut self.settled);
        info!(
            tutorial = %self.tutorial.id,
            seconds = time.display_secs,
            "tutorial closed"
        );
        SessionReport { time, persists }
    }

    async fn persist(&mut self, transition: Transition) {
        let Some(payload) = transition.persist else {
            return;
        };
        while let Some(done) = self.persists.try_join_next() {
            record(&mut self.settled, done);
        }
        let version = self
            .sync
            .record_local(&self.email, &self.tutorial.id, &self.tracker)
            .await;

        let sync = self.sync.clone();
        let email = self.email.clone();
        let id = self.tutorial.id.clone();
        self.persists
            .spawn(async move { sync.push(&email, &id, version, payload).await });
    }
}

fn record(settled: &mut Vec<PersistOutcome>, done: Result<PersistOutcome, JoinError>) {
    match done {
        Ok(outcome) => settled.push(outcome),
        Err(err) => warn!(error = %err, "progress write task panicked"),
    }
}
