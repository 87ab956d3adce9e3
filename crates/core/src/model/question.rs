use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is blank")]
    BlankOption { index: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Minimum number of options a well-formed multiple-choice question carries.
pub const MIN_OPTIONS: usize = 2;

/// A single multiple-choice question.
///
/// Immutable once loaded; a session owns its questions for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt,
    /// `QuestionError::TooFewOptions` for fewer than two options and
    /// `QuestionError::BlankOption` when any option is blank.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::BlankOption { index });
        }

        Ok(Self::from_parts(id, prompt, options))
    }

    /// Builds a question without validation, for sources that already enforce
    /// the option rules.
    #[must_use]
    pub fn from_parts(id: QuestionId, prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options,
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn new_accepts_valid_question() {
        let q = Question::new(QuestionId::new("q1"), "2 + 2?", options(&["3", "4"])).unwrap();
        assert_eq!(q.option_count(), 2);
        assert!(q.has_option(1));
        assert!(!q.has_option(2));
    }

    #[test]
    fn new_rejects_empty_prompt() {
        let err = Question::new(QuestionId::new("q1"), "  ", options(&["a", "b"])).unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn new_rejects_single_option() {
        let err = Question::new(QuestionId::new("q1"), "Pick", options(&["only"])).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { count: 1 });
    }

    #[test]
    fn new_rejects_blank_option() {
        let err = Question::new(QuestionId::new("q1"), "Pick", options(&["a", " "])).unwrap_err();
        assert_eq!(err, QuestionError::BlankOption { index: 1 });
    }

    #[test]
    fn from_parts_skips_validation() {
        let q = Question::from_parts(QuestionId::new("q1"), "Pick", options(&["only"]));
        assert_eq!(q.option_count(), 1);
    }
}
