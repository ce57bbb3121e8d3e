use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::model::ids::TutorialId;

/// Where a learner stands on a tutorial they have opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearningStatus {
    Ongoing,
    Completed,
}

/// Progress selector on the home screen. Only meaningful when signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressFilter {
    #[default]
    All,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProgressFilterError(String);

impl fmt::Display for ParseProgressFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown progress filter: {}", self.0)
    }
}

impl std::error::Error for ParseProgressFilterError {}

impl FromStr for ProgressFilter {
    type Err = ParseProgressFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "semua" => Ok(Self::All),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            other => Err(ParseProgressFilterError(other.to_owned())),
        }
    }
}

pub(crate) fn percentage_of(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(done.min(total)) / f64::from(total) * 100.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = pct as u8;
    pct
}

/// Per-user, per-tutorial record of advancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub tutorial_id: TutorialId,
    pub current_step: u32,
    pub completed_steps: BTreeSet<u32>,
    pub is_completed: bool,
    pub time_spent_secs: u64,
}

impl Progress {
    /// Progress for a tutorial that has never been opened.
    #[must_use]
    pub fn fresh(tutorial_id: TutorialId) -> Self {
        Self {
            tutorial_id,
            current_step: 1,
            completed_steps: BTreeSet::new(),
            is_completed: false,
            time_spent_secs: 0,
        }
    }

    #[must_use]
    pub fn completed_count(&self) -> u32 {
        u32::try_from(self.completed_steps.len()).unwrap_or(u32::MAX)
    }

    /// Completed steps inside `1..=total_steps`. Indices the tutorial no
    /// longer has are not counted.
    #[must_use]
    pub fn completed_within(&self, total_steps: u32) -> u32 {
        if total_steps == 0 {
            return 0;
        }
        let count = self.completed_steps.range(1..=total_steps).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// `true` once every step `1..=total_steps` is completed.
    #[must_use]
    pub fn all_steps_done(&self, total_steps: u32) -> bool {
        total_steps > 0 && (1..=total_steps).all(|step| self.completed_steps.contains(&step))
    }

    /// Completion percentage over in-range steps, rounded to the nearest
    /// whole number.
    #[must_use]
    pub fn percentage(&self, total_steps: u32) -> u8 {
        percentage_of(self.completed_within(total_steps), total_steps)
    }

    #[must_use]
    pub fn status(&self) -> LearningStatus {
        if self.is_completed {
            LearningStatus::Completed
        } else {
            LearningStatus::Ongoing
        }
    }
}
