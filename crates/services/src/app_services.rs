use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::config::CourseConfig;
use crate::course_flow::CourseFlow;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::store::CourseStore;
use crate::theme_service::ThemeService;

/// Assembles app-facing services. Holds the one `CourseService` of the process.
#[derive(Clone)]
pub struct AppServices {
    config: CourseConfig,
    clock: Clock,
    course: Arc<CourseService>,
    theme: Arc<ThemeService>,
}

impl AppServices {
    /// Build services with `SQLite`-backed preferences.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: CourseConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        info!(database_url = %config.database_url, "preferences stored in sqlite");
        Ok(Self::from_storage(config, clock, storage))
    }

    /// Build services with in-memory preferences.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bundled catalog cannot be loaded.
    pub fn in_memory(config: CourseConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::in_memory()?;
        Ok(Self::from_storage(config, clock, storage))
    }

    fn from_storage(config: CourseConfig, clock: Clock, storage: Storage) -> Self {
        let course = Arc::new(CourseService::new(
            Arc::clone(&storage.steps),
            config.latency_policy(),
        ));
        let theme = Arc::new(
            ThemeService::new(Arc::clone(&storage.preferences)).with_key(config.theme_key.clone()),
        );
        Self {
            config,
            clock,
            course,
            theme,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CourseConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn course(&self) -> Arc<CourseService> {
        Arc::clone(&self.course)
    }

    #[must_use]
    pub fn theme(&self) -> Arc<ThemeService> {
        Arc::clone(&self.theme)
    }

    /// Start a fresh course session over the shared course service.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Progress` if the catalog is empty.
    pub fn new_flow(&self) -> Result<CourseFlow, AppServicesError> {
        let store = CourseStore::new(self.course.step_count())?;
        Ok(CourseFlow::new(store, self.course())
            .with_clock(self.clock)
            .with_timings(self.config.read_dwell, self.config.video_load_timeout))
    }
}
