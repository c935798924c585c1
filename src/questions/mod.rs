//! Chat-style questions for the human.
//!
//! An agent poses one or more [`Question`]s; a [`QuestionAsker`] collects
//! [`Answers`], where `None` means the human deferred ("use your judgement").
//! [`ask_until_answered`] keeps re-asking the open questions until each has
//! a real answer, unless the caller chooses to accept deferrals.

pub mod terminal;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::errors::QuestionError;

pub use terminal::TerminalAsker;

/// How a question is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Pick one option
    Single { options: Vec<String> },
    /// Pick any number of options
    Multi { options: Vec<String> },
    /// Free text
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    /// Offer an "Other" free-text choice on choice questions
    #[serde(default = "default_allow_other")]
    pub allow_other: bool,
}

fn default_allow_other() -> bool {
    true
}

impl Question {
    pub fn text(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Text,
            allow_other: false,
        }
    }

    pub fn single(id: impl Into<String>, prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Single { options },
            allow_other: true,
        }
    }

    pub fn multi(id: impl Into<String>, prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Multi { options },
            allow_other: true,
        }
    }
}

/// A concrete answer: one value, or several for multi-choice questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    One(String),
    Many(Vec<String>),
}

impl AnswerValue {
    fn is_blank(&self) -> bool {
        match self {
            AnswerValue::One(s) => s.trim().is_empty(),
            AnswerValue::Many(v) => v.is_empty(),
        }
    }
}

/// Answers keyed by question id. `None` is a deferred answer.
pub type Answers = BTreeMap<String, Option<AnswerValue>>;

#[async_trait]
pub trait QuestionAsker: Send + Sync {
    /// Pose `questions` and return whatever answers were given. Missing ids
    /// count as deferred.
    async fn ask(&self, questions: &[Question]) -> Result<Answers, QuestionError>;
}

/// Check ids are unique and choice questions have options.
pub fn validate(questions: &[Question]) -> Result<(), QuestionError> {
    if questions.is_empty() {
        return Err(QuestionError::Empty);
    }
    let mut seen = HashSet::new();
    for q in questions {
        if !seen.insert(q.id.as_str()) {
            return Err(QuestionError::DuplicateId(q.id.clone()));
        }
        match &q.kind {
            QuestionKind::Single { options } | QuestionKind::Multi { options }
                if options.is_empty() && !q.allow_other =>
            {
                return Err(QuestionError::NoOptions { id: q.id.clone() });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Ask until every question has a non-deferred answer.
///
/// With `accept_deferred`, the asker is called once and deferred or missing
/// answers come back as `None`.
pub async fn ask_until_answered(
    asker: &dyn QuestionAsker,
    questions: &[Question],
    accept_deferred: bool,
) -> Result<Answers, QuestionError> {
    validate(questions)?;

    let mut answers = Answers::new();
    let mut pending: Vec<Question> = questions.to_vec();
    let mut round = 0u32;

    while !pending.is_empty() {
        round += 1;
        tracing::debug!(round, open = pending.len(), "Asking questions");
        let mut got = asker.ask(&pending).await?;

        pending.retain(|q| match got.remove(&q.id).flatten() {
            Some(value) if !value.is_blank() => {
                answers.insert(q.id.clone(), Some(value));
                false
            }
            _ => {
                if accept_deferred {
                    answers.insert(q.id.clone(), None);
                    false
                } else {
                    true
                }
            }
        });
    }

    Ok(answers)
}
