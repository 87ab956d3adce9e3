use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("invalid answer value on the wire: {0}")]
    InvalidWireValue(i64),
}

//
// ─── ANSWER CHOICE ────────────────────────────────────────────────────────────
//

/// Wire value carried for a question with no valid selection.
pub const ANSWER_SENTINEL: i64 = -1;

/// The resolved answer for one question.
///
/// `Unanswered` is the sentinel: it covers both a timeout and a question the
/// candidate moved past without selecting anything. The two cases are not
/// distinguished once submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum AnswerChoice {
    Selected(usize),
    #[default]
    Unanswered,
}

impl AnswerChoice {
    #[must_use]
    pub fn is_answered(self) -> bool {
        matches!(self, Self::Selected(_))
    }

    #[must_use]
    pub fn selected(self) -> Option<usize> {
        match self {
            Self::Selected(index) => Some(index),
            Self::Unanswered => None,
        }
    }

    /// Converts to the signed wire representation.
    #[must_use]
    pub fn to_wire(self) -> i64 {
        match self {
            Self::Selected(index) => i64::try_from(index).unwrap_or(i64::MAX),
            Self::Unanswered => ANSWER_SENTINEL,
        }
    }

    /// Parses the signed wire representation.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidWireValue` for negative values other than
    /// the sentinel.
    pub fn from_wire(value: i64) -> Result<Self, AnswerError> {
        if value == ANSWER_SENTINEL {
            return Ok(Self::Unanswered);
        }
        usize::try_from(value)
            .map(Self::Selected)
            .map_err(|_| AnswerError::InvalidWireValue(value))
    }
}

impl From<AnswerChoice> for i64 {
    fn from(value: AnswerChoice) -> Self {
        value.to_wire()
    }
}

impl TryFrom<i64> for AnswerChoice {
    type Error = AnswerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_wire(value)
    }
}

//
// ─── SUBMITTED ANSWER ─────────────────────────────────────────────────────────
//

/// One entry of the ordered answer list handed to the grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected: AnswerChoice,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn new(question_id: QuestionId, selected: AnswerChoice) -> Self {
        Self {
            question_id,
            selected,
        }
    }
}
