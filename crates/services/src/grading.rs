use std::collections::HashMap;

use async_trait::async_trait;
use quiz_core::model::{AssessmentResult, QuestionId, QuestionOutcome, SubmittedAnswer};

use crate::error::GradeError;

/// Pass mark used when none is configured.
pub const DEFAULT_PASS_THRESHOLD_PERCENT: f64 = 70.0;

/// External collaborator that turns an ordered answer list into a result.
///
/// Pass/fail thresholds are entirely the grader's business.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Grade a complete, ordered answer list.
    ///
    /// # Errors
    ///
    /// Returns `GradeError::Unavailable` for transient failures and
    /// `GradeError::Rejected` when the submission cannot be graded.
    async fn grade(&self, answers: &[SubmittedAnswer]) -> Result<AssessmentResult, GradeError>;
}

/// Grades against a known answer key.
#[derive(Debug, Clone)]
pub struct AnswerKeyGrader {
    key: HashMap<QuestionId, usize>,
    pass_threshold_percent: f64,
}

impl AnswerKeyGrader {
    #[must_use]
    pub fn new(key: HashMap<QuestionId, usize>) -> Self {
        Self {
            key,
            pass_threshold_percent: DEFAULT_PASS_THRESHOLD_PERCENT,
        }
    }

    /// Set the pass mark, clamped to 0..=100.
    #[must_use]
    pub fn with_pass_threshold(mut self, percent: f64) -> Self {
        self.pass_threshold_percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            DEFAULT_PASS_THRESHOLD_PERCENT
        };
        self
    }

    #[must_use]
    pub fn pass_threshold_percent(&self) -> f64 {
        self.pass_threshold_percent
    }
}

fn percentage(correct: u32, total: u32) -> f64 {
    let raw = f64::from(correct) / f64::from(total) * 100.0;
    (raw * 100.0).round() / 100.0
}

#[async_trait]
impl Grader for AnswerKeyGrader {
    async fn grade(&self, answers: &[SubmittedAnswer]) -> Result<AssessmentResult, GradeError> {
        if answers.is_empty() {
            return Err(GradeError::Rejected("empty answer list".into()));
        }
        let total = u32::try_from(answers.len())
            .map_err(|_| GradeError::Rejected("too many answers".into()))?;

        let mut per_question = Vec::with_capacity(answers.len());
        let mut correct = 0_u32;
        for answer in answers {
            let Some(expected) = self.key.get(&answer.question_id) else {
                return Err(GradeError::Rejected(format!(
                    "unknown question '{}'",
                    answer.question_id
                )));
            };
            let is_correct = answer.selected.selected() == Some(*expected);
            if is_correct {
                correct += 1;
            }
            per_question.push(QuestionOutcome {
                question_id: answer.question_id.clone(),
                selected_answer: answer.selected,
                is_correct,
            });
        }

        let score = percentage(correct, total);
        let passed = score >= self.pass_threshold_percent;
        Ok(AssessmentResult::new(score, correct, total, passed, per_question)?)
    }
}
