//! Static course table used as the step data source.

use async_trait::async_trait;
use course_core::model::{CourseStep, StepId};
use tracing::debug;

use crate::repository::{StepSource, StorageError};

const BUNDLED_COURSE: &str = include_str!("../data/course.json");

/// In-memory list of validated steps, served by index.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    steps: Vec<CourseStep>,
}

impl StaticCatalog {
    /// The course shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bundled JSON is malformed or invalid.
    pub fn bundled() -> Result<Self, StorageError> {
        Self::from_json(BUNDLED_COURSE)
    }

    /// Parse and validate a JSON array of steps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the JSON does not parse, otherwise
    /// the errors of `from_steps`.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let steps: Vec<CourseStep> =
            serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;
        Self::from_steps(steps)
    }

    /// Validate an already-built list of steps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidCatalog` if a step fails validation, or
    /// `StorageError::MisplacedStep` if its id is not `step-{position + 1}`.
    pub fn from_steps(steps: Vec<CourseStep>) -> Result<Self, StorageError> {
        for (index, step) in steps.iter().enumerate() {
            step.validate().map_err(course_core::Error::from)?;
            let expected = StepId::for_index(index);
            if step.id() != &expected {
                return Err(StorageError::MisplacedStep {
                    position: index,
                    found: step.id().clone(),
                    expected,
                });
            }
        }
        debug!(steps = steps.len(), "course catalog loaded");
        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[CourseStep] {
        &self.steps
    }
}

#[async_trait]
impl StepSource for StaticCatalog {
    fn step_count(&self) -> usize {
        self.steps.len()
    }

    async fn fetch_step(&self, index: usize) -> Result<Option<CourseStep>, StorageError> {
        Ok(self.steps.get(index).cloned())
    }
}
