use async_trait::async_trait;
use course_core::model::{CourseStep, StepId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::catalog::StaticCatalog;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid course data: {0}")]
    InvalidCatalog(#[from] course_core::Error),

    #[error("step at position {position} has id {found}, expected {expected}")]
    MisplacedStep {
        position: usize,
        found: StepId,
        expected: StepId,
    },
}

/// Source of course step payloads, indexed by position.
///
/// The bundled implementation is a static table; a remote API can replace it.
#[async_trait]
pub trait StepSource: Send + Sync {
    /// Number of steps the source can serve.
    fn step_count(&self) -> usize;

    /// Fetch the payload at `index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be read. A missing step is
    /// `Ok(None)`, not an error.
    async fn fetch_step(&self, index: usize) -> Result<Option<CourseStep>, StorageError>;
}

/// String key-value store for user preferences such as the theme.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Read a preference value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_preference(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a preference value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_preference(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    preferences: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            preferences: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryRepository {
    async fn get_preference(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set_preference(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Aggregates the step source and preference store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub steps: Arc<dyn StepSource>,
    pub preferences: Arc<dyn PreferenceRepository>,
}

impl Storage {
    /// Bundled catalog plus in-memory preferences.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bundled catalog is malformed or invalid.
    pub fn in_memory() -> Result<Self, StorageError> {
        let steps: Arc<dyn StepSource> = Arc::new(StaticCatalog::bundled()?);
        let preferences: Arc<dyn PreferenceRepository> = Arc::new(InMemoryRepository::new());
        Ok(Self { steps, preferences })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preferences_overwrite() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_preference("theme").await.unwrap(), None);

        repo.set_preference("theme", "dark").await.unwrap();
        repo.set_preference("theme", "light").await.unwrap();

        assert_eq!(
            repo.get_preference("theme").await.unwrap().as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn clones_share_state() {
        let repo = InMemoryRepository::new();
        let other = repo.clone();
        repo.set_preference("k", "v").await.unwrap();
        assert_eq!(other.get_preference("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn in_memory_storage_serves_bundled_steps() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(storage.steps.step_count(), 4);
        assert!(storage.steps.fetch_step(0).await.unwrap().is_some());
        assert!(storage.steps.fetch_step(9).await.unwrap().is_none());
    }
}
