use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::StepId;
use crate::model::question::{Question, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("step {id} has an empty title")]
    EmptyTitle { id: StepId },

    #[error("quiz {id} has no questions")]
    NoQuestions { id: StepId },

    #[error("quiz {id} passing score must be <= 100, got {provided}")]
    InvalidPassingScore { id: StepId, provided: u8 },

    #[error("content step {id} has no sections")]
    EmptyContent { id: StepId },

    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── STEP PAYLOADS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLesson {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub video_url: Url,
    /// Catalog duration in seconds; the player may report a more precise value.
    pub duration: u32,
    pub thumbnail: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub passing_score: u8,
}

impl Quiz {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_passing(&self, score: u8) -> bool {
        score >= self.passing_score
    }
}

/// One screen of reading material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Url>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub content: Vec<ContentBlock>,
}

impl ContentSection {
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.content.len()
    }
}

//
// ─── COURSE STEP ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Video,
    Quiz,
    Content,
}

impl StepKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Video => "video",
            StepKind::Quiz => "quiz",
            StepKind::Content => "content",
        }
    }
}

/// A single step of the course, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CourseStep {
    Video(VideoLesson),
    Quiz(Quiz),
    Content(ContentSection),
}

impl CourseStep {
    #[must_use]
    pub fn id(&self) -> &StepId {
        match self {
            CourseStep::Video(v) => &v.id,
            CourseStep::Quiz(q) => &q.id,
            CourseStep::Content(c) => &c.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            CourseStep::Video(v) => &v.title,
            CourseStep::Quiz(q) => &q.title,
            CourseStep::Content(c) => &c.title,
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            CourseStep::Video(v) => &v.description,
            CourseStep::Quiz(q) => &q.description,
            CourseStep::Content(c) => &c.description,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            CourseStep::Video(_) => StepKind::Video,
            CourseStep::Quiz(_) => StepKind::Quiz,
            CourseStep::Content(_) => StepKind::Content,
        }
    }

    #[must_use]
    pub fn as_quiz(&self) -> Option<&Quiz> {
        match self {
            CourseStep::Quiz(q) => Some(q),
            _ => None,
        }
    }

    /// Validate the payload before it is handed to the course.
    ///
    /// # Errors
    ///
    /// Returns `StepError` for an empty title, a quiz without questions or with an
    /// out-of-range passing score, a content step without sections, or an invalid question.
    pub fn validate(&self) -> Result<(), StepError> {
        if self.title().trim().is_empty() {
            return Err(StepError::EmptyTitle {
                id: self.id().clone(),
            });
        }

        match self {
            CourseStep::Video(_) => Ok(()),
            CourseStep::Quiz(quiz) => {
                if quiz.questions.is_empty() {
                    return Err(StepError::NoQuestions {
                        id: quiz.id.clone(),
                    });
                }
                if quiz.passing_score > 100 {
                    return Err(StepError::InvalidPassingScore {
                        id: quiz.id.clone(),
                        provided: quiz.passing_score,
                    });
                }
                for question in &quiz.questions {
                    question.validate()?;
                }
                Ok(())
            }
            CourseStep::Content(section) => {
                if section.content.is_empty() {
                    return Err(StepError::EmptyContent {
                        id: section.id.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
