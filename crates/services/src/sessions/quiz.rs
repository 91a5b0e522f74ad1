use std::collections::HashSet;

use chrono::{DateTime, Utc};
use course_core::evaluator::{self, AnswerSheet};
use course_core::model::{Answer, Question, QuestionId, Quiz, rounded_percent};
use course_core::time;
use tracing::{debug, info};

use super::progress::QuizProgress;
use crate::error::QuizError;
use crate::store::CourseStore;

//
// ─── PHASE & RESULT ────────────────────────────────────────────────────────────
//

/// Outcome of a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    pub score: u8,
    pub passed: bool,
    pub correct: usize,
    pub incorrect: usize,
    pub passing_score: u8,
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Answering { question: usize },
    Passed(QuizResult),
    Failed(QuizResult),
}

impl QuizPhase {
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        match self {
            QuizPhase::Answering { .. } => None,
            QuizPhase::Passed(result) | QuizPhase::Failed(result) => Some(result),
        }
    }
}

/// What happened when the learner pressed "next".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAdvance {
    NextQuestion(usize),
    Finished(QuizResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt (or several, with retakes) at a quiz step.
///
/// `now` values should come from the services-layer clock.
#[derive(Debug, Clone)]
pub struct QuizSession {
    step_index: usize,
    quiz: Quiz,
    phase: QuizPhase,
    answers: AnswerSheet,
    answered: HashSet<QuestionId>,
    submitted: HashSet<QuestionId>,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if the quiz is empty.
    pub fn new(
        step_index: usize,
        quiz: Quiz,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if quiz.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self {
            step_index,
            quiz,
            phase: QuizPhase::Answering { question: 0 },
            answers: AnswerSheet::new(),
            answered: HashSet::new(),
            submitted: HashSet::new(),
            started_at,
        })
    }

    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(self.phase, QuizPhase::Answering { .. })
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.phase.result()
    }

    /// Index of the question on screen; the last one once finished.
    #[must_use]
    pub fn current_index(&self) -> usize {
        match self.phase {
            QuizPhase::Answering { question } => question,
            _ => self.quiz.question_count() - 1,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current_index()]
    }

    #[must_use]
    pub fn answer_for(&self, id: &QuestionId) -> Option<&Answer> {
        self.answers.get(id)
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answer_for(&self.current_question().id)
    }

    /// Record the learner's answer for the current question.
    ///
    /// Choice questions count as answered as soon as a valid value is given.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` once results are shown, and
    /// `QuizError::AnswerLocked` once the question's feedback is visible.
    pub fn answer(&mut self, answer: Answer) -> Result<(), QuizError> {
        if self.is_finished() {
            return Err(QuizError::Finished);
        }
        let question = self.current_question();
        if self.feedback().is_some() {
            return Err(QuizError::AnswerLocked {
                id: question.id.clone(),
            });
        }
        let id = question.id.clone();
        let immediate = evaluator::has_valid_answer(question, Some(&answer))
            && !question.kind.needs_submission();
        self.answers.insert(id.clone(), answer);
        if immediate {
            self.answered.insert(id);
        }
        Ok(())
    }

    /// Whether the submit action is offered for the current question.
    #[must_use]
    pub fn can_submit_answer(&self) -> bool {
        let question = self.current_question();
        !self.is_finished()
            && question.kind.needs_submission()
            && evaluator::has_valid_answer(question, self.current_answer())
    }

    /// Lock in the current answer of a fill-in-blank, matching or ordering question
    /// so its feedback is shown. Returns `false` when there is nothing to submit.
    pub fn submit_answer(&mut self) -> bool {
        if !self.can_submit_answer() {
            return false;
        }
        let id = self.current_question().id.clone();
        self.answered.insert(id.clone());
        self.submitted.insert(id);
        true
    }

    /// Correctness of the current answer once feedback is visible.
    #[must_use]
    pub fn feedback(&self) -> Option<bool> {
        let question = self.current_question();
        let visible = self.is_finished()
            || (self.answered.contains(&question.id)
                && (!question.kind.needs_submission() || self.submitted.contains(&question.id)));
        visible.then(|| evaluator::check_answer(question, self.current_answer()))
    }

    #[must_use]
    pub fn explanation_visible(&self) -> bool {
        self.feedback().is_some() && self.current_question().explanation.is_some()
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        !self.is_finished()
            && evaluator::has_valid_answer(self.current_question(), self.current_answer())
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        matches!(self.phase, QuizPhase::Answering { question } if question > 0)
    }

    /// Move to the next question, or score the attempt on the last one.
    ///
    /// Finishing records the score in `store` and marks the step complete when the
    /// score reaches the passing score.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` if results are already shown, or
    /// `QuizError::MissingAnswer` if the current question has no valid answer.
    pub fn next(
        &mut self,
        store: &mut CourseStore,
        now: DateTime<Utc>,
    ) -> Result<QuizAdvance, QuizError> {
        let QuizPhase::Answering { question } = self.phase else {
            return Err(QuizError::Finished);
        };
        if !self.can_advance() {
            return Err(QuizError::MissingAnswer {
                id: self.current_question().id.clone(),
            });
        }

        if question + 1 < self.quiz.question_count() {
            self.phase = QuizPhase::Answering {
                question: question + 1,
            };
            return Ok(QuizAdvance::NextQuestion(question + 1));
        }

        let result = self.score(now);
        store.set_quiz_score(self.quiz.id.clone(), result.score);
        if result.passed {
            store.mark_step_complete(self.step_index);
            self.phase = QuizPhase::Passed(result);
        } else {
            self.phase = QuizPhase::Failed(result);
        }
        info!(
            quiz = %self.quiz.id,
            score = result.score,
            passed = result.passed,
            "quiz finished"
        );
        Ok(QuizAdvance::Finished(result))
    }

    fn score(&self, now: DateTime<Utc>) -> QuizResult {
        let total = self.quiz.question_count();
        let correct = evaluator::correct_count(&self.quiz, &self.answers);
        let score = rounded_percent(correct, total);
        QuizResult {
            score,
            passed: self.quiz.is_passing(score),
            correct,
            incorrect: total - correct,
            passing_score: self.quiz.passing_score,
            elapsed_secs: time::elapsed_secs(self.started_at, now),
        }
    }

    /// Returns `false` on the first question or after finishing.
    pub fn previous(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.phase = QuizPhase::Answering {
            question: self.current_index() - 1,
        };
        true
    }

    /// Start over with no answers. The recorded score and step completion stay.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotFinished` while the quiz is still being answered.
    pub fn retake(&mut self, now: DateTime<Utc>) -> Result<(), QuizError> {
        if !self.is_finished() {
            return Err(QuizError::NotFinished);
        }
        debug!(quiz = %self.quiz.id, "quiz retake");
        self.phase = QuizPhase::Answering { question: 0 };
        self.answers.clear();
        self.answered.clear();
        self.submitted.clear();
        self.started_at = now;
        Ok(())
    }

    /// Seconds on the quiz timer; frozen once results are shown.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        match self.result() {
            Some(result) => result.elapsed_secs,
            None => time::elapsed_secs(self.started_at, now),
        }
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.quiz.question_count();
        let question = self.current_index();
        QuizProgress {
            question,
            total,
            answered: self.answered.len(),
            percent: rounded_percent(question + 1, total),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use course_core::model::{QuestionKind, StepId};
    use course_core::time::fixed_now;

    fn true_false_quiz(count: usize, passing_score: u8) -> Quiz {
        Quiz {
            id: StepId::for_index(1),
            title: "Checkpoint".into(),
            description: String::new(),
            questions: (1..=count)
                .map(|n| {
                    Question::new(
                        format!("q{n}"),
                        QuestionKind::TrueFalse,
                        format!("Statement {n}"),
                        Answer::text("true"),
                    )
                })
                .collect(),
            passing_score,
        }
    }

    fn store_at_quiz() -> CourseStore {
        let mut store = CourseStore::default();
        store.mark_step_complete(0);
        assert!(store.set_current_step(1));
        store
    }

    fn answer_all(
        session: &mut QuizSession,
        store: &mut CourseStore,
        correct: usize,
        now: DateTime<Utc>,
    ) -> QuizAdvance {
        let total = session.quiz().question_count();
        for n in 0..total {
            let value = if n < correct { "true" } else { "false" };
            session.answer(Answer::text(value)).unwrap();
            let advance = session.next(store, now).unwrap();
            if n + 1 == total {
                return advance;
            }
        }
        unreachable!("quiz has at least one question")
    }

    #[test]
    fn passing_attempt_completes_step_and_unlocks_next() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(10, 70), fixed_now()).unwrap();

        let QuizAdvance::Finished(result) = answer_all(&mut session, &mut store, 8, fixed_now())
        else {
            panic!("expected finish");
        };

        assert_eq!(result.score, 80);
        assert!(result.passed);
        assert_eq!((result.correct, result.incorrect), (8, 2));
        assert!(store.state().is_step_complete(1));
        assert!(store.can_navigate_to_step(2));
        assert_eq!(store.state().quiz_score(&StepId::for_index(1)), Some(80));
    }

    #[test]
    fn failing_attempt_blocks_next_step_and_retake_resets() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(10, 70), fixed_now()).unwrap();

        answer_all(&mut session, &mut store, 5, fixed_now());

        assert!(matches!(session.phase(), QuizPhase::Failed(r) if r.score == 50));
        assert!(!store.state().is_step_complete(1));
        assert!(!store.can_navigate_to_step(2));
        assert!(!store.set_current_step(2));

        session.retake(fixed_now()).unwrap();
        assert_eq!(session.phase(), QuizPhase::Answering { question: 0 });
        assert!(session.current_answer().is_none());
        assert_eq!(session.progress().answered, 0);
        assert_eq!(store.state().quiz_score(&StepId::for_index(1)), Some(50));
    }

    #[test]
    fn next_requires_a_valid_answer() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(2, 70), fixed_now()).unwrap();

        assert!(!session.can_advance());
        let err = session.next(&mut store, fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::MissingAnswer { id: QuestionId::new("q1") });

        session.answer(Answer::text("")).unwrap();
        assert!(!session.can_advance());
    }

    #[test]
    fn choice_answer_is_final_once_feedback_shows() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(1, 70), fixed_now()).unwrap();

        session.answer(Answer::text("false")).unwrap();
        assert_eq!(session.feedback(), Some(false));
        assert_eq!(
            session.answer(Answer::text("true")),
            Err(QuizError::AnswerLocked { id: QuestionId::new("q1") })
        );
        assert_eq!(session.current_answer(), Some(&Answer::text("false")));

        let QuizAdvance::Finished(result) = session.next(&mut store, fixed_now()).unwrap() else {
            panic!("expected finish");
        };
        assert_eq!(result.score, 0);
        assert!(!result.passed);
        assert!(!store.state().is_step_complete(1));
    }

    #[test]
    fn submitted_blank_is_read_only() {
        let quiz = Quiz {
            questions: vec![Question::new(
                "lang",
                QuestionKind::FillInBlank,
                "React Native uses ___",
                Answer::text("JavaScript"),
            )],
            ..true_false_quiz(1, 70)
        };
        let mut session = QuizSession::new(1, quiz, fixed_now()).unwrap();

        session.answer(Answer::text("Java")).unwrap();
        session.answer(Answer::text("Kotlin")).unwrap();
        assert!(session.submit_answer());
        assert_eq!(session.feedback(), Some(false));

        assert!(matches!(
            session.answer(Answer::text("JavaScript")),
            Err(QuizError::AnswerLocked { .. })
        ));
        assert_eq!(session.current_answer(), Some(&Answer::text("Kotlin")));
    }

    #[test]
    fn whitespace_blank_can_be_submitted_and_is_wrong() {
        let quiz = Quiz {
            questions: vec![Question::new(
                "lang",
                QuestionKind::FillInBlank,
                "React Native uses ___",
                Answer::text("JavaScript"),
            )],
            ..true_false_quiz(1, 70)
        };
        let mut session = QuizSession::new(1, quiz, fixed_now()).unwrap();

        session.answer(Answer::text("   ")).unwrap();
        assert!(session.can_advance());
        assert!(session.submit_answer());
        assert_eq!(session.feedback(), Some(false));
    }

    #[test]
    fn choice_feedback_is_immediate() {
        let mut session = QuizSession::new(1, true_false_quiz(2, 70), fixed_now()).unwrap();
        assert_eq!(session.feedback(), None);
        session.answer(Answer::text("False")).unwrap();
        assert_eq!(session.feedback(), Some(false));
        assert!(!session.can_submit_answer());
    }

    #[test]
    fn fill_in_blank_feedback_waits_for_submit() {
        let quiz = Quiz {
            questions: vec![
                Question::new(
                    "lang",
                    QuestionKind::FillInBlank,
                    "React Native uses ___",
                    Answer::text("JavaScript"),
                )
                .with_explanation("It runs JavaScript."),
            ],
            ..true_false_quiz(1, 70)
        };
        let mut session = QuizSession::new(1, quiz, fixed_now()).unwrap();

        assert!(!session.submit_answer());
        session.answer(Answer::text("  javascript ")).unwrap();
        assert_eq!(session.feedback(), None);
        assert!(!session.explanation_visible());

        assert!(session.submit_answer());
        assert_eq!(session.feedback(), Some(true));
        assert!(session.explanation_visible());
    }

    #[test]
    fn previous_stops_at_first_question() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(3, 70), fixed_now()).unwrap();
        assert!(!session.previous());

        session.answer(Answer::text("true")).unwrap();
        session.next(&mut store, fixed_now()).unwrap();
        assert_eq!(session.current_index(), 1);
        assert!(session.previous());
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_answer(), Some(&Answer::text("true")));
    }

    #[test]
    fn timer_stops_when_results_are_shown() {
        let mut store = store_at_quiz();
        let start = fixed_now();
        let mut session = QuizSession::new(1, true_false_quiz(1, 70), start).unwrap();
        assert_eq!(session.elapsed_secs(start + Duration::seconds(42)), 42);

        session.answer(Answer::text("true")).unwrap();
        session.next(&mut store, start + Duration::seconds(75)).unwrap();

        assert_eq!(session.elapsed_secs(start + Duration::seconds(600)), 75);
        assert_eq!(session.result().map(|r| r.elapsed_secs), Some(75));
    }

    #[test]
    fn finished_quiz_rejects_answers_and_retake_requires_finish() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(1, 70), fixed_now()).unwrap();
        assert_eq!(session.retake(fixed_now()), Err(QuizError::NotFinished));

        session.answer(Answer::text("true")).unwrap();
        session.next(&mut store, fixed_now()).unwrap();

        assert_eq!(session.answer(Answer::text("false")), Err(QuizError::Finished));
        assert_eq!(
            session.next(&mut store, fixed_now()).unwrap_err(),
            QuizError::Finished
        );
        assert_eq!(session.feedback(), Some(true));
    }

    #[test]
    fn retake_after_pass_keeps_step_complete() {
        let mut store = store_at_quiz();
        let mut session = QuizSession::new(1, true_false_quiz(1, 70), fixed_now()).unwrap();
        session.answer(Answer::text("true")).unwrap();
        session.next(&mut store, fixed_now()).unwrap();

        session.retake(fixed_now()).unwrap();
        assert!(store.state().is_step_complete(1));
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let quiz = true_false_quiz(0, 70);
        assert_eq!(
            QuizSession::new(1, quiz, fixed_now()).unwrap_err(),
            QuizError::NoQuestions
        );
    }

    #[test]
    fn progress_tracks_question_position() {
        let session = QuizSession::new(1, true_false_quiz(5, 70), fixed_now()).unwrap();
        let progress = session.progress();
        assert_eq!(progress.question, 0);
        assert_eq!(progress.total, 5);
        assert_eq!(progress.percent, 20);
    }
}
