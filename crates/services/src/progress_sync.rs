//! Write-through persistence of step progress.
//!
//! Every transition is written to the local cache first with a higher
//! `version` and `synced = false`, then sent to the backend. A remote
//! success marks the record synced only when no newer local write exists,
//! so the last request sent decides the cached state. Dirty records are
//! re-sent the next time the tutorial is loaded while the backend is
//! reachable.

use std::sync::Arc;

use diy_core::model::{Progress, Tutorial, TutorialId};
use diy_core::progress::{PersistPayload, StepTracker};
use diy_core::Clock;
use storage::{CachedProgress, LocalStore};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::LearningApi;

/// Where loaded progress came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    Remote,
    LocalCache,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProgress {
    pub progress: Progress,
    pub source: ProgressSource,
}

/// Result of sending one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The backend stored it and no newer local write exists.
    Synced,
    /// The backend stored it, but a newer local write had already happened.
    Superseded,
    /// The backend call failed; the local record stays dirty.
    LocalOnly,
}

#[derive(Clone)]
pub struct ProgressSync {
    api: Arc<dyn LearningApi>,
    store: LocalStore,
    clock: Clock,
    local: Arc<Mutex<()>>,
}

impl ProgressSync {
    #[must_use]
    pub fn new(api: Arc<dyn LearningApi>, store: LocalStore, clock: Clock) -> Self {
        Self {
            api,
            store,
            clock,
            local: Arc::new(Mutex::new(())),
        }
    }

    /// Progress to resume from: the backend's record when reachable, else
    /// the local cache, else a fresh start. A dirty local record wins over
    /// the backend and is pushed to it.
    pub async fn load(&self, email: &str, tutorial: &Tutorial) -> LoadedProgress {
        let id = &tutorial.id;
        let cached = self.cached(email, id).await;
        let remote = match self.api.tutorial_progress(id).await {
            Ok(remote) => Ok(remote),
            Err(err) => {
                warn!(tutorial = %id, error = %err, "progress fetch failed; using local cache");
                Err(err)
            }
        };

        match (cached, remote) {
            (Some(cached), remote) if !cached.synced => {
                let reachable = remote.is_ok();
                let time_spent = remote.ok().flatten().map_or(0, |p| p.time_spent_secs);
                let mut progress = cached.into_progress(id.clone(), Some(tutorial.total_steps()));
                progress.time_spent_secs = time_spent;
                if reachable {
                    self.reconcile(email, id).await;
                }
                LoadedProgress {
                    progress,
                    source: ProgressSource::LocalCache,
                }
            }
            (_, Ok(Some(progress))) => {
                self.mirror(email, &progress).await;
                LoadedProgress {
                    progress,
                    source: ProgressSource::Remote,
                }
            }
            (Some(cached), Err(_)) => LoadedProgress {
                progress: cached.into_progress(id.clone(), Some(tutorial.total_steps())),
                source: ProgressSource::LocalCache,
            },
            (_, Ok(None)) | (None, Err(_)) => LoadedProgress {
                progress: Progress::fresh(id.clone()),
                source: ProgressSource::Fresh,
            },
        }
    }

    /// Write the tracker state to the local cache as a new dirty version.
    /// Returns the version written, or `None` if the cache is unwritable.
    pub async fn record_local(
        &self,
        email: &str,
        id: &TutorialId,
        tracker: &StepTracker,
    ) -> Option<u64> {
        let _guard = self.local.lock().await;
        let previous = match self.store.progress(email, id).await {
            Ok(cached) => cached.map_or(0, |c| c.version),
            Err(err) => {
                warn!(tutorial = %id, error = %err, "progress cache unreadable; overwriting");
                0
            }
        };
        let record = CachedProgress {
            current_step: tracker.current_step(),
            completed_steps: tracker.completed_steps().clone(),
            version: previous + 1,
            synced: false,
        };
        match self.store.save_progress(email, id, &record).await {
            Ok(()) => Some(record.version),
            Err(err) => {
                warn!(tutorial = %id, error = %err, "failed to cache progress");
                None
            }
        }
    }

    /// Send one transition to the backend and settle the local record.
    /// Failures are logged, never returned.
    pub async fn push(
        &self,
        email: &str,
        id: &TutorialId,
        version: Option<u64>,
        payload: PersistPayload,
    ) -> PersistOutcome {
        if let Err(err) = self
            .api
            .update_progress(id, payload.step, payload.step_completed)
            .await
        {
            warn!(tutorial = %id, step = payload.step, error = %err, "progress update failed; kept locally");
            return PersistOutcome::LocalOnly;
        }
        match version {
            Some(version) => self.settle(email, id, version).await,
            None => PersistOutcome::Synced,
        }
    }

    /// [`ProgressSync::record_local`] followed by [`ProgressSync::push`].
    pub async fn persist(
        &self,
        email: &str,
        id: &TutorialId,
        tracker: &StepTracker,
        payload: PersistPayload,
    ) -> PersistOutcome {
        let version = self.record_local(email, id, tracker).await;
        self.push(email, id, version, payload).await
    }

    /// Re-send a dirty cached record: every completed step, then the
    /// current step. Returns `true` when nothing is left to send.
    pub async fn reconcile(&self, email: &str, id: &TutorialId) -> bool {
        let Some(cached) = self.cached(email, id).await else {
            return true;
        };
        if cached.synced {
            return true;
        }

        for step in &cached.completed_steps {
            if let Err(err) = self.api.update_progress(id, *step, true).await {
                warn!(tutorial = %id, error = %err, "reconcile failed; record stays dirty");
                return false;
            }
        }
        let current_done = cached.completed_steps.contains(&cached.current_step);
        if let Err(err) = self
            .api
            .update_progress(id, cached.current_step, current_done)
            .await
        {
            warn!(tutorial = %id, error = %err, "reconcile failed; record stays dirty");
            return false;
        }

        debug!(tutorial = %id, version = cached.version, "reconciled cached progress");
        self.settle(email, id, cached.version).await == PersistOutcome::Synced
    }

    /// Add the tutorial to the learner's index as ongoing.
    pub async fn touch_learning(&self, email: &str, id: &TutorialId) {
        if let Err(err) = self.store.touch_learning(email, id, self.clock.now()).await {
            warn!(tutorial = %id, error = %err, "failed to update learning index");
        }
    }

    pub async fn mark_learning_completed(&self, email: &str, id: &TutorialId) {
        if let Err(err) = self
            .store
            .mark_learning_completed(email, id, self.clock.now())
            .await
        {
            warn!(tutorial = %id, error = %err, "failed to mark tutorial completed");
        }
    }

    async fn cached(&self, email: &str, id: &TutorialId) -> Option<CachedProgress> {
        match self.store.progress(email, id).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(tutorial = %id, error = %err, "progress cache unreadable");
                None
            }
        }
    }

    /// Store the backend's record as the clean local copy.
    async fn mirror(&self, email: &str, progress: &Progress) {
        let id = &progress.tutorial_id;
        let _guard = self.local.lock().await;
        let version = match self.store.progress(email, id).await {
            Ok(Some(cached)) if !cached.synced => return,
            Ok(cached) => cached.map_or(0, |c| c.version),
            Err(_) => 0,
        };
        let record = CachedProgress {
            current_step: progress.current_step,
            completed_steps: progress.completed_steps.clone(),
            version,
            synced: true,
        };
        if let Err(err) = self.store.save_progress(email, id, &record).await {
            warn!(tutorial = %id, error = %err, "failed to cache remote progress");
        }
    }

    async fn settle(&self, email: &str, id: &TutorialId, version: u64) -> PersistOutcome {
        let _guard = self.local.lock().await;
        let mut cached = match self.store.progress(email, id).await {
            Ok(Some(cached)) => cached,
            Ok(None) => return PersistOutcome::Synced,
            Err(err) => {
                warn!(tutorial = %id, error = %err, "progress cache unreadable after sync");
                return PersistOutcome::Synced;
            }
        };

        if cached.version > version {
            // An older write landed after a newer one; the backend may now
            // hold stale state, so the newer record must be sent again.
            if cached.synced {
                cached.synced = false;
                self.save(email, id, &cached).await;
            }
            return PersistOutcome::Superseded;
        }

        if !cached.synced {
            cached.synced = true;
            self.save(email, id, &cached).await;
        }
        PersistOutcome::Synced
    }

    async fn save(&self, email: &str, id: &TutorialId, record: &CachedProgress) {
        if let Err(err) = self.store.save_progress(email, id, record).await {
            warn!(tutorial = %id, error = %err, "failed to update progress cache");
        }
    }
}
