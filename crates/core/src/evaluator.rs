//! Answer checking and scoring for quiz questions.

use std::collections::HashMap;

use crate::model::{Answer, Question, QuestionId, QuestionKind, Quiz, rounded_percent};

/// Learner answers keyed by question id.
pub type AnswerSheet = HashMap<QuestionId, Answer>;

/// Decides whether `answer` is correct for `question`.
///
/// Scalar kinds compare case-insensitively after trimming. Matching checks every
/// canonical pair and ignores extra keys in the learner's mapping. Ordering must
/// match element by element.
#[must_use]
pub fn check_answer(question: &Question, answer: Option<&Answer>) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match question.kind {
        QuestionKind::MultipleChoice | QuestionKind::TrueFalse | QuestionKind::FillInBlank => {
            normalize(&answer.to_plain_string()) == normalize(&question.answer.to_plain_string())
        }
        QuestionKind::Matching => {
            let (Some(expected), Some(given)) = (question.answer.as_pairs(), answer.as_pairs())
            else {
                return false;
            };
            expected
                .iter()
                .all(|(key, value)| given.get(key) == Some(value))
        }
        QuestionKind::Ordering => {
            match (question.answer.as_sequence(), answer.as_sequence()) {
                (Some(expected), Some(given)) => expected == given,
                _ => false,
            }
        }
        QuestionKind::Unknown => false,
    }
}

/// Counts the questions answered correctly.
#[must_use]
pub fn correct_count(quiz: &Quiz, answers: &AnswerSheet) -> usize {
    quiz.questions
        .iter()
        .filter(|q| check_answer(q, answers.get(&q.id)))
        .count()
}

/// Percentage of correct answers, rounded to the nearest integer.
///
/// A quiz without questions scores zero.
#[must_use]
pub fn calculate_score(quiz: &Quiz, answers: &AnswerSheet) -> u8 {
    rounded_percent(correct_count(quiz, answers), quiz.question_count())
}

/// Whether `answer` is complete enough to let the learner move on.
#[must_use]
pub fn has_valid_answer(question: &Question, answer: Option<&Answer>) -> bool {
    let Some(answer) = answer else {
        return false;
    };
    if answer.is_empty() {
        return false;
    }

    match question.kind {
        QuestionKind::Matching => answer.as_pairs().is_some_and(|m| !m.is_empty()),
        QuestionKind::Ordering => answer.as_sequence().is_some_and(|s| !s.is_empty()),
        _ => true,
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
