use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::ids::StepId;
use crate::model::step::CourseStep;

/// Number of steps in the bundled course.
pub const DEFAULT_TOTAL_STEPS: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("a course needs at least one step")]
    NoSteps,
}

//
// ─── ACTIONS ───────────────────────────────────────────────────────────────────
//

/// The closed set of transitions accepted by [`ProgressState::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum CourseAction {
    SetCurrentStep(usize),
    SetStepData {
        index: usize,
        data: Arc<CourseStep>,
    },
    MarkStepComplete(usize),
    SetQuizScore {
        quiz_id: StepId,
        score: u8,
    },
    SetLoading {
        loading: bool,
        step: Option<usize>,
    },
    Restart,
}

//
// ─── STEP STATUS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Current,
    Available,
    Locked,
}

impl StepStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Completed => "completed",
            StepStatus::Current => "current",
            StepStatus::Available => "available",
            StepStatus::Locked => "locked",
        }
    }

    /// Whether the tracker lets the learner jump to a step in this state.
    #[must_use]
    pub fn is_selectable(self) -> bool {
        !matches!(self, StepStatus::Locked)
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Course progress for one learner session.
///
/// Values are never mutated in place; every transition goes through `reduce`,
/// which returns the next state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    current_step: usize,
    total_steps: usize,
    steps: Vec<Option<Arc<CourseStep>>>,
    step_progress: BTreeMap<usize, bool>,
    quiz_scores: BTreeMap<StepId, u8>,
    is_loading: bool,
    loading_step: Option<usize>,
}

impl ProgressState {
    /// Creates a fresh state positioned on the first step.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoSteps` when `total_steps` is zero.
    pub fn new(total_steps: usize) -> Result<Self, ProgressError> {
        if total_steps == 0 {
            return Err(ProgressError::NoSteps);
        }
        Ok(Self::fresh(total_steps))
    }

    fn fresh(total_steps: usize) -> Self {
        Self {
            current_step: 0,
            total_steps,
            steps: vec![None; total_steps],
            step_progress: BTreeMap::new(),
            quiz_scores: BTreeMap::new(),
            is_loading: false,
            loading_step: None,
        }
    }

    /// Applies one action and returns the resulting state.
    ///
    /// Navigation to a locked or out-of-range step, and data or completion for an
    /// out-of-range index, leave the state unchanged.
    #[must_use]
    pub fn reduce(&self, action: CourseAction) -> Self {
        match action {
            CourseAction::SetCurrentStep(index) => {
                if index >= self.total_steps || !self.can_navigate_to_step(index) {
                    return self.clone();
                }
                Self {
                    current_step: index,
                    ..self.clone()
                }
            }
            CourseAction::SetStepData { index, data } => {
                if index >= self.total_steps {
                    return self.clone();
                }
                let mut steps = self.steps.clone();
                steps[index] = Some(data);
                Self {
                    steps,
                    ..self.clone()
                }
            }
            CourseAction::MarkStepComplete(index) => {
                if index >= self.total_steps {
                    return self.clone();
                }
                let mut step_progress = self.step_progress.clone();
                step_progress.insert(index, true);
                Self {
                    step_progress,
                    ..self.clone()
                }
            }
            CourseAction::SetQuizScore { quiz_id, score } => {
                let mut quiz_scores = self.quiz_scores.clone();
                quiz_scores.insert(quiz_id, score.min(100));
                Self {
                    quiz_scores,
                    ..self.clone()
                }
            }
            CourseAction::SetLoading { loading, step } => Self {
                is_loading: loading,
                loading_step: if loading { step } else { None },
                ..self.clone()
            },
            CourseAction::Restart => Self::fresh(self.total_steps),
        }
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn loading_step(&self) -> Option<usize> {
        self.loading_step
    }

    /// True while the given step is the one being loaded.
    #[must_use]
    pub fn is_loading_step(&self, index: usize) -> bool {
        self.is_loading && self.loading_step == Some(index)
    }

    #[must_use]
    pub fn step_data(&self, index: usize) -> Option<&Arc<CourseStep>> {
        self.steps.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn current_step_data(&self) -> Option<&Arc<CourseStep>> {
        self.step_data(self.current_step)
    }

    #[must_use]
    pub fn is_step_complete(&self, index: usize) -> bool {
        self.step_progress.get(&index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn quiz_score(&self, quiz_id: &StepId) -> Option<u8> {
        self.quiz_scores.get(quiz_id).copied()
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<StepId, u8> {
        &self.quiz_scores
    }

    /// Step 0 is always reachable; any later step needs every earlier step complete.
    #[must_use]
    pub fn can_navigate_to_step(&self, index: usize) -> bool {
        (0..index).all(|i| self.is_step_complete(i))
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.step_progress.values().filter(|done| **done).count()
    }

    /// Overall completion as a rounded percentage.
    #[must_use]
    pub fn overall_progress(&self) -> u8 {
        rounded_percent(self.completed_count(), self.total_steps)
    }

    #[must_use]
    pub fn is_course_complete(&self) -> bool {
        self.completed_count() >= self.total_steps
    }

    #[must_use]
    pub fn has_next_step(&self) -> bool {
        self.current_step + 1 < self.total_steps
    }

    #[must_use]
    pub fn step_status(&self, index: usize) -> StepStatus {
        if self.is_step_complete(index) {
            StepStatus::Completed
        } else if index == self.current_step {
            StepStatus::Current
        } else if self.can_navigate_to_step(index) {
            StepStatus::Available
        } else {
            StepStatus::Locked
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::fresh(DEFAULT_TOTAL_STEPS)
    }
}

/// `round(100 * part / whole)` with halves rounded up; zero when `whole` is zero.
#[must_use]
pub fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole);
    let pct = (200 * part + whole) / (2 * whole);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn complete(state: &ProgressState, indices: &[usize]) -> ProgressState {
        indices.iter().fold(state.clone(), |s, i| {
            s.reduce(CourseAction::MarkStepComplete(*i))
        })
    }

    #[test]
    fn zero_steps_is_rejected() {
        assert_eq!(ProgressState::new(0).unwrap_err(), ProgressError::NoSteps);
    }

    #[test]
    fn first_step_is_always_navigable() {
        let state = ProgressState::default();
        assert!(state.can_navigate_to_step(0));
        assert!(!state.can_navigate_to_step(1));
    }

    #[test]
    fn locked_navigation_is_ignored() {
        let state = ProgressState::default();
        let next = state.reduce(CourseAction::SetCurrentStep(2));
        assert_eq!(next, state);
    }

    #[test]
    fn out_of_range_navigation_is_ignored() {
        let state = complete(&ProgressState::default(), &[0, 1, 2, 3]);
        let next = state.reduce(CourseAction::SetCurrentStep(4));
        assert_eq!(next.current_step(), 0);
    }

    #[test]
    fn navigation_follows_completion() {
        let state = complete(&ProgressState::default(), &[0]);
        let next = state.reduce(CourseAction::SetCurrentStep(1));
        assert_eq!(next.current_step(), 1);
        assert_eq!(state.current_step(), 0);
    }

    #[test]
    fn overall_progress_rounds() {
        let state = ProgressState::new(3).unwrap();
        assert_eq!(state.overall_progress(), 0);
        let state = complete(&state, &[0]);
        assert_eq!(state.overall_progress(), 33);
        let state = complete(&state, &[1]);
        assert_eq!(state.overall_progress(), 67);
        let state = complete(&state, &[2]);
        assert_eq!(state.overall_progress(), 100);
        assert!(state.is_course_complete());
    }

    #[test]
    fn loading_off_clears_step() {
        let state = ProgressState::default().reduce(CourseAction::SetLoading {
            loading: true,
            step: Some(2),
        });
        assert!(state.is_loading_step(2));
        let state = state.reduce(CourseAction::SetLoading {
            loading: false,
            step: Some(2),
        });
        assert!(!state.is_loading());
        assert_eq!(state.loading_step(), None);
    }

    #[test]
    fn scores_are_clamped() {
        let id = StepId::for_index(1);
        let state = ProgressState::default().reduce(CourseAction::SetQuizScore {
            quiz_id: id.clone(),
            score: 140,
        });
        assert_eq!(state.quiz_score(&id), Some(100));
    }

    #[test]
    fn restart_clears_everything_but_size() {
        let state = complete(&ProgressState::new(2).unwrap(), &[0])
            .reduce(CourseAction::SetCurrentStep(1))
            .reduce(CourseAction::SetQuizScore {
                quiz_id: StepId::for_index(1),
                score: 50,
            });
        let reset = state.reduce(CourseAction::Restart);
        assert_eq!(reset, ProgressState::new(2).unwrap());
    }

    #[test]
    fn step_status_precedence() {
        let state = complete(&ProgressState::default(), &[0])
            .reduce(CourseAction::SetCurrentStep(1));
        assert_eq!(state.step_status(0), StepStatus::Completed);
        assert_eq!(state.step_status(1), StepStatus::Current);
        assert_eq!(state.step_status(2), StepStatus::Locked);

        let back = state.reduce(CourseAction::SetCurrentStep(0));
        assert_eq!(back.step_status(1), StepStatus::Available);
    }

    #[test]
    fn rounded_percent_rounds_half_up() {
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(1, 2), 50);
        assert_eq!(rounded_percent(0, 0), 0);
    }

    proptest! {
        #[test]
        fn gating_matches_prefix_completion(
            done in proptest::collection::vec(any::<bool>(), DEFAULT_TOTAL_STEPS),
            target in 0..DEFAULT_TOTAL_STEPS + 2,
        ) {
            let indices: Vec<usize> = done
                .iter()
                .enumerate()
                .filter_map(|(i, d)| d.then_some(i))
                .collect();
            let state = complete(&ProgressState::default(), &indices);
            let expected = (0..target).all(|i| done.get(i).copied().unwrap_or(false));
            prop_assert_eq!(state.can_navigate_to_step(target), expected);
        }
    }
}
