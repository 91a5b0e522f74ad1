//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{ProgressError, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while resolving a step's payload.
///
/// Both kinds are shown to the learner with a retry action; nothing retries on its own.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseLoadError {
    #[error("Step {} not found", .index + 1)]
    StepNotFound { index: usize },
    #[error("failed to load step {}: {source}", .index + 1)]
    LoadFailure {
        index: usize,
        #[source]
        source: StorageError,
    },
}

impl CourseLoadError {
    /// Message for the retry prompt.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CourseLoadError::StepNotFound { .. } => self.to_string(),
            CourseLoadError::LoadFailure { .. } => "Failed to load step".to_string(),
        }
    }
}

/// Errors emitted by `QuizSession`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("quiz already finished")]
    Finished,
    #[error("quiz is still in progress")]
    NotFinished,
    #[error("question {id} has no valid answer yet")]
    MissingAnswer { id: QuestionId },
    #[error("answer to question {id} is already shown and cannot change")]
    AnswerLocked { id: QuestionId },
}

/// Errors emitted by `VideoSession`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VideoError {
    #[error("the video has not been played yet")]
    NotWatched,
}

/// Errors emitted by `ReadingSession`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReadingError {
    #[error("only {read} of {total} sections have been read")]
    SectionsUnread { read: usize, total: usize },
}

/// Errors emitted by `CourseFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseFlowError {
    #[error("step {} is not loaded", .index + 1)]
    NotLoaded { index: usize },
    #[error(transparent)]
    Load(#[from] CourseLoadError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// Errors emitted by `ThemeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThemeServiceError {
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
    Progress(#[from] ProgressError),
}
