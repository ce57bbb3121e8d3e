use diy_core::model::Theme;
use storage::LocalStore;
use tracing::warn;

use crate::error::SettingsError;

/// Device-local preferences.
#[derive(Clone)]
pub struct SettingsService {
    store: LocalStore,
}

impl SettingsService {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Stored theme, or the light default when unset or unreadable.
    pub async fn theme(&self) -> Theme {
        match self.store.theme().await {
            Ok(theme) => theme.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "theme preference unreadable; using default");
                Theme::default()
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SettingsError::Storage` if the preference cannot be saved.
    pub async fn set_theme(&self, theme: Theme) -> Result<Theme, SettingsError> {
        self.store.save_theme(theme).await?;
        Ok(theme)
    }

    /// Flip between light and dark and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Storage` if the preference cannot be saved.
    pub async fn toggle_theme(&self) -> Result<Theme, SettingsError> {
        let next = self.theme().await.toggled();
        self.set_theme(next).await
    }
}
