//! Step-wise tutorial progress.
//!
//! `StepTracker` holds the learner's position in a tutorial (`current`, 1-based),
//! the set of steps marked done, and whether every step is done. Transitions
//! return a [`Transition`] describing what changed so callers can persist it.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{Progress, TutorialId, percentage_of};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("tutorial has no steps")]
    NoSteps,

    #[error("step {step} is outside 1..={total}")]
    StepOutOfRange { step: u32, total: u32 },
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Payload for the backend's step update: the step the learner is on and
/// whether that step is in the completed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistPayload {
    pub step: u32,
    pub step_completed: bool,
}

/// Outcome of one tracker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Present iff the current step or the completed set changed.
    pub persist: Option<PersistPayload>,
    /// True exactly once per tracker: when the last missing step got marked.
    pub completed_now: bool,
}

impl Transition {
    const UNCHANGED: Transition = Transition {
        persist: None,
        completed_now: false,
    };

    #[must_use]
    pub fn changed(&self) -> bool {
        self.persist.is_some()
    }
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTracker {
    total: u32,
    current: u32,
    completed: BTreeSet<u32>,
    is_completed: bool,
}

impl StepTracker {
    /// Fresh tracker on step 1 with nothing completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoSteps` when `total_steps` is zero.
    pub fn new(total_steps: u32) -> Result<Self, ProgressError> {
        if total_steps == 0 {
            return Err(ProgressError::NoSteps);
        }
        Ok(Self {
            total: total_steps,
            current: 1,
            completed: BTreeSet::new(),
            is_completed: false,
        })
    }

    /// Rebuild a tracker from stored progress.
    ///
    /// The current step is clamped into range and completed indices outside
    /// `1..=total_steps` are dropped. The completion flag is derived from the
    /// set rather than trusted from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoSteps` when `total_steps` is zero.
    pub fn from_progress(progress: &Progress, total_steps: u32) -> Result<Self, ProgressError> {
        let mut tracker = Self::new(total_steps)?;
        tracker.current = progress.current_step.clamp(1, total_steps);
        tracker.completed = progress
            .completed_steps
            .iter()
            .copied()
            .filter(|step| (1..=total_steps).contains(step))
            .collect();
        tracker.is_completed = tracker.all_steps_done();
        Ok(tracker)
    }

    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn completed_steps(&self) -> &BTreeSet<u32> {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn is_step_completed(&self, step: u32) -> bool {
        self.completed.contains(&step)
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        let done = u32::try_from(self.completed.len()).unwrap_or(u32::MAX);
        percentage_of(done, self.total)
    }

    /// Move to the next step. No-op on the last step.
    pub fn advance(&mut self) -> Transition {
        if self.current >= self.total {
            return Transition::UNCHANGED;
        }
        self.current += 1;
        self.moved()
    }

    /// Move to the previous step. No-op on the first step.
    pub fn retreat(&mut self) -> Transition {
        if self.current <= 1 {
            return Transition::UNCHANGED;
        }
        self.current -= 1;
        self.moved()
    }

    /// Select any step directly; no ordering constraint applies.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::StepOutOfRange` when `target` is not in `1..=total`.
    pub fn jump(&mut self, target: u32) -> Result<Transition, ProgressError> {
        if !(1..=self.total).contains(&target) {
            return Err(ProgressError::StepOutOfRange {
                step: target,
                total: self.total,
            });
        }
        if target == self.current {
            return Ok(Transition::UNCHANGED);
        }
        self.current = target;
        Ok(self.moved())
    }

    /// Mark the current step as done.
    ///
    /// When this fills the completed set the tracker flips to completed and
    /// the returned transition has `completed_now` set. That happens once:
    /// later calls cannot add anything new.
    pub fn mark_complete(&mut self) -> Transition {
        if !self.completed.insert(self.current) {
            return Transition::UNCHANGED;
        }
        let completed_now = !self.is_completed && self.all_steps_done();
        if completed_now {
            self.is_completed = true;
        }
        Transition {
            persist: Some(self.payload()),
            completed_now,
        }
    }

    /// Materialize the tracker as a `Progress` record.
    #[must_use]
    pub fn snapshot(&self, tutorial_id: TutorialId, time_spent_secs: u64) -> Progress {
        Progress {
            tutorial_id,
            current_step: self.current,
            completed_steps: self.completed.clone(),
            is_completed: self.is_completed,
            time_spent_secs,
        }
    }

    fn all_steps_done(&self) -> bool {
        (1..=self.total).all(|step| self.completed.contains(&step))
    }

    fn payload(&self) -> PersistPayload {
        PersistPayload {
            step: self.current,
            step_completed: self.completed.contains(&self.current),
        }
    }

    fn moved(&self) -> Transition {
        Transition {
            persist: Some(self.payload()),
            completed_now: false,
        }
    }
}
