#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod catalog;
pub mod config;
pub mod error;
pub mod my_learning;
pub mod progress_sync;
pub mod session;
pub mod settings;
pub mod time_tracking;
pub mod tutorial_session;

pub use diy_core::Clock;

pub use api::{error_message, HttpApi, LearningApi, TutorialFilter};
pub use app_services::AppServices;
pub use catalog::CatalogService;
pub use config::ApiConfig;
pub use error::{
    ApiError, AppServicesError, AuthError, CatalogError, ConfigError, MyLearningError,
    SettingsError, TutorialSessionError,
};
pub use my_learning::{LearningCard, LearningOverview, MyLearningService};
pub use progress_sync::{LoadedProgress, PersistOutcome, ProgressSource, ProgressSync};
pub use session::SessionContext;
pub use settings::SettingsService;
pub use time_tracking::{TimeReport, TimeTrackingTask, TimerHandle};
pub use tutorial_session::{SessionReport, TutorialSession};
