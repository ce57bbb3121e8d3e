//! Shared error types for the services crate.

use thiserror::Error;

use diy_core::forms::FieldErrors;
use diy_core::progress::ProgressError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Fallback shown when a failure carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Errors emitted by the REST client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl ApiError {
    /// Text suitable for an inline error or a notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. }
            | ApiError::NotFound(message)
            | ApiError::Unauthorized(message) => message.clone(),
            ApiError::Transport(_) | ApiError::Decode(_) | ApiError::Endpoint(_) => {
                GENERIC_ERROR_MESSAGE.to_owned()
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Errors emitted while reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid API base URL {value:?}: {source}")]
    BaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("unknown environment {0:?} (expected dev or prod)")]
    Environment(String),
    #[error("invalid timeout {0:?} (expected whole seconds)")]
    Timeout(String),
}

/// Errors emitted by `SessionContext` sign-in flows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Form validation failed; nothing was sent.
    #[error("{0}")]
    Validation(FieldErrors),
    /// The backend refused the request. `field` names the form field the
    /// message belongs to.
    #[error("{message}")]
    Rejected {
        field: &'static str,
        message: String,
    },
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("tutorial not found")]
    NotFound,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted by `TutorialSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorialSessionError {
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted by `MyLearningService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MyLearningError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
