use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::{AnswerChoice, SubmittedAnswer};
use crate::model::ids::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("score must be a percentage between 0 and 100")]
    InvalidScore,

    #[error("correct count ({correct}) exceeds total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("per-question results ({len}) do not match total questions ({total})")]
    LengthMismatch { len: usize, total: u32 },

    #[error("correct count ({correct}) does not match correct outcomes ({flagged})")]
    CountMismatch { correct: u32, flagged: u32 },
}

/// Grader verdict for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected_answer: AnswerChoice,
    pub is_correct: bool,
}

/// Result of a graded assessment, as returned by the grader.
///
/// The session never computes correctness; it only relays this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResult")]
pub struct AssessmentResult {
    score: f64,
    correct_count: u32,
    total_questions: u32,
    passed: bool,
    per_question: Vec<QuestionOutcome>,
}

#[derive(Deserialize)]
struct RawResult {
    score: f64,
    correct_count: u32,
    total_questions: u32,
    passed: bool,
    per_question: Vec<QuestionOutcome>,
}

impl TryFrom<RawResult> for AssessmentResult {
    type Error = ResultError;

    fn try_from(raw: RawResult) -> Result<Self, Self::Error> {
        Self::new(
            raw.score,
            raw.correct_count,
            raw.total_questions,
            raw.passed,
            raw.per_question,
        )
    }
}

impl AssessmentResult {
    /// Builds a result after checking its counts are self-consistent.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` when the score is outside 0..=100, the correct
    /// count exceeds the total, or the per-question list disagrees with the
    /// totals.
    pub fn new(
        score: f64,
        correct_count: u32,
        total_questions: u32,
        passed: bool,
        per_question: Vec<QuestionOutcome>,
    ) -> Result<Self, ResultError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ResultError::InvalidScore);
        }
        if correct_count > total_questions {
            return Err(ResultError::CorrectExceedsTotal {
                correct: correct_count,
                total: total_questions,
            });
        }
        if u32::try_from(per_question.len()).ok() != Some(total_questions) {
            return Err(ResultError::LengthMismatch {
                len: per_question.len(),
                total: total_questions,
            });
        }
        let flagged = per_question.iter().filter(|o| o.is_correct).count();
        let flagged = u32::try_from(flagged).unwrap_or(u32::MAX);
        if flagged != correct_count {
            return Err(ResultError::CountMismatch {
                correct: correct_count,
                flagged,
            });
        }

        Ok(Self {
            score,
            correct_count,
            total_questions,
            passed,
            per_question,
        })
    }

    /// True when the per-question list covers exactly `answers`, in order.
    #[must_use]
    pub fn matches_submission(&self, answers: &[SubmittedAnswer]) -> bool {
        self.per_question.len() == answers.len()
            && self
                .per_question
                .iter()
                .zip(answers)
                .all(|(outcome, answer)| outcome.question_id == answer.question_id)
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn per_question(&self) -> &[QuestionOutcome] {
        &self.per_question
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, correct: bool) -> QuestionOutcome {
        QuestionOutcome {
            question_id: QuestionId::new(id),
            selected_answer: AnswerChoice::Selected(0),
            is_correct: correct,
        }
    }

    #[test]
    fn accepts_consistent_result() {
        let result =
            AssessmentResult::new(50.0, 1, 2, false, vec![outcome("a", true), outcome("b", false)])
                .unwrap();
        assert_eq!(result.correct_count(), 1);
        assert!(!result.passed());
    }

    #[test]
    fn rejects_out_of_range_score() {
        let err = AssessmentResult::new(120.0, 0, 0, true, Vec::new()).unwrap_err();
        assert_eq!(err, ResultError::InvalidScore);
    }

    #[test]
    fn rejects_flag_count_mismatch() {
        let err = AssessmentResult::new(
            100.0,
            2,
            2,
            true,
            vec![outcome("a", true), outcome("b", false)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResultError::CountMismatch {
                correct: 2,
                flagged: 1
            }
        );
    }

    #[test]
    fn matches_submission_checks_order() {
        let result =
            AssessmentResult::new(50.0, 1, 2, false, vec![outcome("a", true), outcome("b", false)])
                .unwrap();
        let in_order = vec![
            SubmittedAnswer::new(QuestionId::new("a"), AnswerChoice::Selected(0)),
            SubmittedAnswer::new(QuestionId::new("b"), AnswerChoice::Unanswered),
        ];
        let swapped: Vec<_> = in_order.iter().rev().cloned().collect();
        assert!(result.matches_submission(&in_order));
        assert!(!result.matches_submission(&swapped));
    }

    #[test]
    fn deserialization_validates() {
        let bad = r#"{"score":10.0,"correct_count":3,"total_questions":1,"passed":false,"per_question":[]}"#;
        assert!(serde_json::from_str::<AssessmentResult>(bad).is_err());
    }
}
