//! Signed-in learner, held once in memory and mirrored to local storage.

use std::sync::{Arc, RwLock};

use diy_core::forms::{LoginDraft, RegistrationDraft};
use diy_core::model::UserProfile;
use storage::LocalStore;
use tracing::{info, warn};

use crate::api::{AuthSession, LearningApi};
use crate::error::{ApiError, AuthError};

const DUPLICATE_EMAIL: &str = "User already exists";

#[derive(Clone)]
pub struct SessionContext {
    api: Arc<dyn LearningApi>,
    store: LocalStore,
    current: Arc<RwLock<Option<UserProfile>>>,
}

impl SessionContext {
    #[must_use]
    pub fn new(api: Arc<dyn LearningApi>, store: LocalStore) -> Self {
        Self {
            api,
            store,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Load the stored user and token at startup. Unreadable records are
    /// treated as signed out.
    pub async fn restore(&self) -> Option<UserProfile> {
        match self.store.auth_token().await {
            Ok(token) => self.api.set_token(token),
            Err(err) => warn!(error = %err, "stored auth token unreadable"),
        }
        let user = match self.store.current_user().await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "stored user unreadable; starting signed out");
                None
            }
        };
        self.replace(user.clone());
        user
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` when nobody is signed in.
    pub fn require_user(&self) -> Result<UserProfile, AuthError> {
        self.current_user().ok_or(AuthError::NotSignedIn)
    }

    /// Validate, authenticate and remember the learner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` before any request when the form is
    /// incomplete, and `AuthError::Rejected` (attached to the password field)
    /// when the backend refuses the credentials.
    pub async fn login(&self, draft: LoginDraft) -> Result<UserProfile, AuthError> {
        let form = draft.validate().map_err(AuthError::Validation)?;
        match self.api.login(&form).await {
            Ok(session) => Ok(self.establish(session).await),
            Err(err) => Err(AuthError::Rejected {
                field: "password",
                message: rejection_message(&err, "Email atau password salah"),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::Validation` before any request when the form is
    /// invalid, and `AuthError::Rejected` mapped onto the offending field
    /// when the backend refuses the registration.
    pub async fn register(&self, draft: RegistrationDraft) -> Result<UserProfile, AuthError> {
        let registration = draft.validate().map_err(AuthError::Validation)?;
        match self.api.register(&registration).await {
            Ok(session) => Ok(self.establish(session).await),
            Err(err) => Err(registration_rejection(&err)),
        }
    }

    /// Re-read the profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without a session, or the API error.
    pub async fn refresh(&self) -> Result<UserProfile, AuthError> {
        self.require_user()?;
        let user = self.api.me().await?;
        if let Err(err) = self.store.save_current_user(&user).await {
            warn!(error = %err, "failed to persist refreshed user");
        }
        self.replace(Some(user.clone()));
        Ok(user)
    }

    pub async fn logout(&self) {
        self.api.clear_token();
        if let Err(err) = self.store.clear_session().await {
            warn!(error = %err, "failed to clear stored session");
        }
        self.replace(None);
        info!("signed out");
    }

    async fn establish(&self, session: AuthSession) -> UserProfile {
        let AuthSession { user, token } = session;
        if let Some(token) = token {
            self.api.set_token(Some(token.clone()));
            if let Err(err) = self.store.save_auth_token(&token).await {
                warn!(error = %err, "failed to persist auth token");
            }
        }
        if let Err(err) = self.store.save_current_user(&user).await {
            warn!(error = %err, "failed to persist signed-in user");
        }
        self.replace(Some(user.clone()));
        info!(username = %user.username, "signed in");
        user
    }

    fn replace(&self, user: Option<UserProfile>) {
        if let Ok(mut guard) = self.current.write() {
            *guard = user;
        }
    }
}

fn rejection_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Transport(_) | ApiError::Decode(_) | ApiError::Endpoint(_) => fallback.to_owned(),
        other => other.user_message(),
    }
}

fn registration_rejection(err: &ApiError) -> AuthError {
    let message = rejection_message(err, "Registrasi gagal");
    if message.contains(DUPLICATE_EMAIL) {
        AuthError::Rejected {
            field: "email",
            message: "Email sudah terdaftar".into(),
        }
    } else if message.contains("username") {
        AuthError::Rejected {
            field: "username",
            message: "Username sudah digunakan".into(),
        }
    } else {
        AuthError::Rejected {
            field: "email",
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_errors_map_to_fields() {
        let dup = ApiError::Status {
            status: 400,
            message: "User already exists".into(),
        };
        assert!(matches!(
            registration_rejection(&dup),
            AuthError::Rejected { field: "email", ref message } if message == "Email sudah terdaftar"
        ));

        let taken = ApiError::Status {
            status: 400,
            message: "username is taken".into(),
        };
        assert!(matches!(
            registration_rejection(&taken),
            AuthError::Rejected { field: "username", ref message } if message == "Username sudah digunakan"
        ));

        let other = ApiError::Status {
            status: 500,
            message: "Database down".into(),
        };
        assert!(matches!(
            registration_rejection(&other),
            AuthError::Rejected { field: "email", ref message } if message == "Database down"
        ));
    }

    #[test]
    fn first_field_error_in_body_picks_the_form_field() {
        let body: serde_json::Value = serde_json::from_str(
            r#"{"errors":{"username":"username already taken","email":"Invalid email"}}"#,
        )
        .unwrap();
        let err = ApiError::Status {
            status: 400,
            message: crate::api::error_message(&body),
        };
        assert!(matches!(
            registration_rejection(&err),
            AuthError::Rejected { field: "username", .. }
        ));
    }

    #[test]
    fn decode_failures_use_fallback_text() {
        let err = ApiError::Decode("eof".into());
        assert_eq!(rejection_message(&err, "Registrasi gagal"), "Registrasi gagal");
    }
}
