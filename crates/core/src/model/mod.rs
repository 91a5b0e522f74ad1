mod ids;
mod progress;
mod question;
mod step;
mod theme;

pub use ids::{ParseIdError, QuestionId, StepId};
pub use progress::{
    CourseAction, DEFAULT_TOTAL_STEPS, ProgressError, ProgressState, StepStatus, rounded_percent,
};
pub use question::{Answer, Question, QuestionError, QuestionKind};
pub use step::{ContentBlock, ContentSection, CourseStep, Quiz, StepError, StepKind, VideoLesson};
pub use theme::{Theme, ThemeParseError};
