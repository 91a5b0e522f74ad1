use thiserror::Error;

use crate::model::{QuestionError, StepError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
