use std::sync::Arc;

use course_core::model::Theme;
use storage::repository::PreferenceRepository;
use tracing::{info, warn};

use crate::error::ThemeServiceError;

/// Preference key the theme is stored under.
pub const THEME_STORAGE_KEY: &str = "@course_app_theme";

/// Loads and persists the learner's colour theme.
#[derive(Clone)]
pub struct ThemeService {
    repo: Arc<dyn PreferenceRepository>,
    key: String,
    system: Option<Theme>,
}

impl ThemeService {
    #[must_use]
    pub fn new(repo: Arc<dyn PreferenceRepository>) -> Self {
        Self {
            repo,
            key: THEME_STORAGE_KEY.to_owned(),
            system: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Scheme reported by the platform, used when nothing valid is stored.
    #[must_use]
    pub fn with_system_theme(mut self, system: Option<Theme>) -> Self {
        self.system = system;
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve the theme to show at startup. Never fails.
    pub async fn load(&self) -> Theme {
        let stored = match self.repo.get_preference(&self.key).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "theme preference unreadable, using fallback");
                None
            }
        };
        if let Some(raw) = stored.as_deref() {
            if raw.parse::<Theme>().is_err() {
                warn!(value = raw, "ignoring invalid stored theme");
            }
        }
        Theme::resolve(stored.as_deref(), self.system)
    }

    /// Persist `theme` and return it.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError` if the preference cannot be written.
    pub async fn set(&self, theme: Theme) -> Result<Theme, ThemeServiceError> {
        self.repo.set_preference(&self.key, theme.as_str()).await?;
        info!(theme = theme.as_str(), "theme saved");
        Ok(theme)
    }

    /// Persist and return the opposite of `current`.
    ///
    /// # Errors
    ///
    /// Returns `ThemeServiceError` if the preference cannot be written.
    pub async fn toggle(&self, current: Theme) -> Result<Theme, ThemeServiceError> {
        self.set(current.toggled()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::InMemoryRepository;
    use storage::repository::StorageError;

    struct FailingRepo;

    #[async_trait]
    impl PreferenceRepository for FailingRepo {
        async fn get_preference(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("unavailable".into()))
        }

        async fn set_preference(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("unavailable".into()))
        }
    }

    #[tokio::test]
    async fn missing_preference_falls_back_to_system_then_light() {
        let repo = Arc::new(InMemoryRepository::new());
        let plain = ThemeService::new(repo.clone());
        assert_eq!(plain.load().await, Theme::Light);

        let dark_system = ThemeService::new(repo).with_system_theme(Some(Theme::Dark));
        assert_eq!(dark_system.load().await, Theme::Dark);
    }

    #[tokio::test]
    async fn toggle_persists_under_fixed_key() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ThemeService::new(repo.clone());

        let next = service.toggle(Theme::Light).await.unwrap();
        assert_eq!(next, Theme::Dark);
        assert_eq!(
            repo.get_preference("@course_app_theme").await.unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(service.load().await, Theme::Dark);
    }

    #[tokio::test]
    async fn invalid_stored_value_is_ignored() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.set_preference(THEME_STORAGE_KEY, "sepia").await.unwrap();
        let service = ThemeService::new(repo).with_system_theme(Some(Theme::Dark));
        assert_eq!(service.load().await, Theme::Dark);
    }

    #[tokio::test]
    async fn read_failure_falls_back_and_write_failure_is_reported() {
        let service = ThemeService::new(Arc::new(FailingRepo));
        assert_eq!(service.load().await, Theme::Light);
        assert!(matches!(
            service.set(Theme::Dark).await,
            Err(ThemeServiceError::Storage(StorageError::Connection(_)))
        ));
    }
}
