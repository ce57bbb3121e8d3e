mod ids;
mod progress;
mod theme;
mod tutorial;
mod user;

pub use ids::{ParseIdError, TutorialId, UserId};
pub(crate) use progress::percentage_of;
pub use progress::{LearningStatus, ParseProgressFilterError, Progress, ProgressFilter};
pub use theme::{ParseThemeError, Theme};
pub use tutorial::{Difficulty, MediaType, Step, Tutorial, TutorialError, TutorialSummary};
pub use user::{Address, UserProfile};
