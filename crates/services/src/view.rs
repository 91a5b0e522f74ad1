//! Headless presentation models derived from course state.

use course_core::model::{ProgressState, StepStatus};
use course_core::time::format_elapsed;

use crate::error::CourseLoadError;
use crate::sessions::QuizResult;

/// Tracker titles, by step position.
pub const STEP_TITLES: [&str; 4] = ["Video Lesson", "Basic Quiz", "Content Reading", "Final Quiz"];

const LOADING_MESSAGES: [&str; 4] = [
    "Loading video lesson...",
    "Preparing quiz questions...",
    "Loading course content...",
    "Setting up final assessment...",
];

#[must_use]
pub fn step_title(index: usize) -> String {
    STEP_TITLES
        .get(index)
        .map_or_else(|| format!("Step {}", index + 1), |title| (*title).to_owned())
}

#[must_use]
pub fn loading_message(index: usize) -> &'static str {
    LOADING_MESSAGES
        .get(index)
        .copied()
        .unwrap_or("Loading content...")
}

#[must_use]
pub fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "Completed",
        StepStatus::Current => "In Progress",
        StepStatus::Available => "Available",
        StepStatus::Locked => "Locked",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRowVm {
    pub index: usize,
    pub title: String,
    pub number_label: String,
    pub status: StepStatus,
    pub status_label: &'static str,
    pub selectable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressOverviewVm {
    pub percent: u8,
    pub percent_label: String,
    pub step_label: String,
    pub completed_label: String,
    pub rows: Vec<StepRowVm>,
    pub quiz_scores_label: Option<String>,
}

impl From<&ProgressState> for ProgressOverviewVm {
    fn from(state: &ProgressState) -> Self {
        let total = state.total_steps();
        let rows = (0..total)
            .map(|index| {
                let status = state.step_status(index);
                StepRowVm {
                    index,
                    title: step_title(index),
                    number_label: format!("Step {}", index + 1),
                    status,
                    status_label: status_label(status),
                    selectable: status.is_selectable(),
                }
            })
            .collect();

        let scores = state.quiz_scores();
        let quiz_scores_label = (!scores.is_empty()).then(|| {
            scores
                .values()
                .map(|score| format!("{score}%"))
                .collect::<Vec<_>>()
                .join(", ")
        });

        let percent = state.overall_progress();
        Self {
            percent,
            percent_label: format!("{percent}% Complete"),
            step_label: format!("Step {} of {}", state.current_step() + 1, total),
            completed_label: format!("{}/{}", state.completed_count(), total),
            rows,
            quiz_scores_label,
        }
    }
}

#[must_use]
pub fn map_progress_overview(state: &ProgressState) -> ProgressOverviewVm {
    ProgressOverviewVm::from(state)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizResultVm {
    pub headline: &'static str,
    pub score_line: String,
    pub detail_line: String,
    pub correct: usize,
    pub incorrect: usize,
    pub passed: bool,
}

impl From<&QuizResult> for QuizResultVm {
    fn from(result: &QuizResult) -> Self {
        Self {
            headline: if result.passed {
                "Congratulations!"
            } else {
                "Try Again"
            },
            score_line: format!(
                "You scored {}% ({})",
                result.score,
                if result.passed { "Passed" } else { "Failed" }
            ),
            detail_line: format!(
                "Passing score: {}% • Time: {}",
                result.passing_score,
                format_elapsed(result.elapsed_secs)
            ),
            correct: result.correct,
            incorrect: result.incorrect,
            passed: result.passed,
        }
    }
}

#[must_use]
pub fn map_quiz_result(result: &QuizResult) -> QuizResultVm {
    QuizResultVm::from(result)
}

/// Error screen shown when a step cannot be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadErrorVm {
    pub title: &'static str,
    pub message: String,
    pub retry_label: &'static str,
}

impl From<&CourseLoadError> for LoadErrorVm {
    fn from(err: &CourseLoadError) -> Self {
        Self {
            title: "Oops! Something went wrong",
            message: err.user_message(),
            retry_label: "Try Again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseAction, StepId};

    #[test]
    fn fresh_course_overview() {
        let vm = map_progress_overview(&ProgressState::default());
        assert_eq!(vm.percent_label, "0% Complete");
        assert_eq!(vm.step_label, "Step 1 of 4");
        assert_eq!(vm.rows[0].status, StepStatus::Current);
        assert_eq!(vm.rows[0].status_label, "In Progress");
        assert!(vm.rows[1..].iter().all(|row| !row.selectable));
        assert_eq!(vm.quiz_scores_label, None);
    }

    #[test]
    fn completed_steps_unlock_rows() {
        let state = ProgressState::default()
            .reduce(CourseAction::MarkStepComplete(0))
            .reduce(CourseAction::SetQuizScore {
                quiz_id: StepId::for_index(1),
                score: 80,
            });
        let vm = map_progress_overview(&state);

        assert_eq!(vm.percent, 25);
        assert_eq!(vm.rows[0].status_label, "Completed");
        assert_eq!(vm.rows[1].status, StepStatus::Available);
        assert_eq!(vm.rows[1].title, "Basic Quiz");
        assert_eq!(vm.rows[2].status, StepStatus::Locked);
        assert_eq!(vm.completed_label, "1/4");
        assert_eq!(vm.quiz_scores_label.as_deref(), Some("80%"));
    }

    #[test]
    fn quiz_result_lines() {
        let vm = map_quiz_result(&QuizResult {
            score: 60,
            passed: false,
            correct: 3,
            incorrect: 2,
            passing_score: 70,
            elapsed_secs: 95,
        });
        assert_eq!(vm.headline, "Try Again");
        assert_eq!(vm.score_line, "You scored 60% (Failed)");
        assert_eq!(vm.detail_line, "Passing score: 70% • Time: 1:35");
    }

    #[test]
    fn load_error_uses_user_message() {
        let vm = LoadErrorVm::from(&CourseLoadError::StepNotFound { index: 5 });
        assert_eq!(vm.message, "Step 6 not found");
        assert_eq!(vm.retry_label, "Try Again");
    }

    #[test]
    fn titles_and_messages_fall_back_past_the_bundled_course() {
        assert_eq!(step_title(6), "Step 7");
        assert_eq!(loading_message(2), "Loading course content...");
        assert_eq!(loading_message(9), "Loading content...");
    }
}
