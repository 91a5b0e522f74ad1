use std::sync::Arc;

use course_core::model::{CourseAction, CourseStep, ProgressError, ProgressState, StepId};
use tracing::{debug, info};

/// Owns the current `ProgressState` and exposes one dispatcher per action.
///
/// Every dispatcher runs the pure reducer and swaps in the returned state.
#[derive(Debug, Clone, Default)]
pub struct CourseStore {
    state: ProgressState,
}

impl CourseStore {
    /// # Errors
    ///
    /// Returns `ProgressError::NoSteps` when `total_steps` is zero.
    pub fn new(total_steps: usize) -> Result<Self, ProgressError> {
        Ok(Self {
            state: ProgressState::new(total_steps)?,
        })
    }

    #[must_use]
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    fn dispatch(&mut self, action: CourseAction) {
        self.state = self.state.reduce(action);
    }

    /// Move to step `index`. Returns `false` and leaves the state unchanged when
    /// the step is locked or out of range.
    pub fn set_current_step(&mut self, index: usize) -> bool {
        if index >= self.state.total_steps() || !self.state.can_navigate_to_step(index) {
            debug!(step = index + 1, "navigation ignored");
            return false;
        }
        self.dispatch(CourseAction::SetCurrentStep(index));
        true
    }

    pub fn set_step_data(&mut self, index: usize, data: Arc<CourseStep>) {
        self.dispatch(CourseAction::SetStepData { index, data });
    }

    pub fn mark_step_complete(&mut self, index: usize) {
        if !self.state.is_step_complete(index) {
            info!(step = index + 1, "step completed");
        }
        self.dispatch(CourseAction::MarkStepComplete(index));
    }

    pub fn set_quiz_score(&mut self, quiz_id: StepId, score: u8) {
        self.dispatch(CourseAction::SetQuizScore { quiz_id, score });
    }

    pub fn set_loading(&mut self, loading: bool, step: Option<usize>) {
        self.dispatch(CourseAction::SetLoading { loading, step });
    }

    pub fn reset_course(&mut self) {
        info!("course restarted");
        self.dispatch(CourseAction::Restart);
    }

    #[must_use]
    pub fn can_navigate_to_step(&self, index: usize) -> bool {
        self.state.can_navigate_to_step(index)
    }

    #[must_use]
    pub fn overall_progress(&self) -> u8 {
        self.state.overall_progress()
    }
}
