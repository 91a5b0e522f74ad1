use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} of kind {kind} has an answer of the wrong shape")]
    AnswerShape { id: QuestionId, kind: QuestionKind },

    #[error("question {id} has an answer that is not one of its options")]
    AnswerNotInOptions { id: QuestionId },
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// The five supported question kinds.
///
/// Unrecognised kind strings deserialize to `Unknown`, which never evaluates as correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    Matching,
    Ordering,
    #[serde(other)]
    Unknown,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::TrueFalse => "true-false",
            QuestionKind::FillInBlank => "fill-in-blank",
            QuestionKind::Matching => "matching",
            QuestionKind::Ordering => "ordering",
            QuestionKind::Unknown => "unknown",
        }
    }

    /// Kinds whose answer is a single string.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse | QuestionKind::FillInBlank
        )
    }

    /// Kinds that need an explicit submit before feedback is shown.
    ///
    /// Choice questions give feedback as soon as an option is picked.
    #[must_use]
    pub fn needs_submission(self) -> bool {
        matches!(
            self,
            QuestionKind::FillInBlank | QuestionKind::Matching | QuestionKind::Ordering
        )
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// An answer value: canonical on a question, or provided by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Sequence(Vec<String>),
    Pairs(BTreeMap<String, String>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn sequence<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn pairs<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Pairs(
            items
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Answer::Sequence(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pairs(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Answer::Pairs(map) => Some(map),
            _ => None,
        }
    }

    /// True for an empty string, list or mapping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Text(s) => s.is_empty(),
            Answer::Sequence(items) => items.is_empty(),
            Answer::Pairs(map) => map.is_empty(),
        }
    }

    /// Flattens the answer into a single string for scalar comparison.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            Answer::Text(s) => s.clone(),
            Answer::Sequence(items) => items.join(","),
            Answer::Pairs(map) => map
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        kind: QuestionKind,
        prompt: impl Into<String>,
        answer: Answer,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            kind,
            prompt: prompt.into(),
            options: Vec::new(),
            answer,
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Checks that the prompt is present and the canonical answer fits the kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first problem found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt {
                id: self.id.clone(),
            });
        }

        let shape_ok = match self.kind {
            QuestionKind::Matching => matches!(self.answer, Answer::Pairs(_)),
            QuestionKind::Ordering => matches!(self.answer, Answer::Sequence(_)),
            kind if kind.is_scalar() => matches!(self.answer, Answer::Text(_)),
            _ => true,
        };
        if !shape_ok {
            return Err(QuestionError::AnswerShape {
                id: self.id.clone(),
                kind: self.kind,
            });
        }

        if self.kind == QuestionKind::MultipleChoice && !self.options.is_empty() {
            let answer = self.answer.to_plain_string();
            if !self.options.iter().any(|opt| *opt == answer) {
                return Err(QuestionError::AnswerNotInOptions {
                    id: self.id.clone(),
                });
            }
        }

        if self.kind == QuestionKind::Ordering && !self.options.is_empty() {
            let mut expected = self.answer.as_sequence().unwrap_or_default().to_vec();
            let mut offered = self.options.clone();
            expected.sort();
            offered.sort();
            if expected != offered {
                return Err(QuestionError::AnswerNotInOptions {
                    id: self.id.clone(),
                });
            }
        }

        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
