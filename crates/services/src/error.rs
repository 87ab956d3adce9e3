//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionId, ResultError};
use storage::repository::LoadError;

/// Errors emitted by graders.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("grader unavailable: {0}")]
    Unavailable(String),
    #[error("grader rejected the submission: {0}")]
    Rejected(String),
    #[error("grader returned a result for a different answer set")]
    MismatchedResult,
    #[error(transparent)]
    Malformed(#[from] ResultError),
}

/// Errors emitted by assessment sessions.
///
/// Timeouts and unanswered questions are ordinary transitions and never
/// surface here.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("question '{question_id}' appears more than once")]
    DuplicateQuestion { question_id: QuestionId },
    #[error("session is not accepting input")]
    NotInProgress,
    #[error("question '{question_id}' is not the current question")]
    NotCurrent { question_id: QuestionId },
    #[error("option {option} is out of range ({available} options)")]
    OptionOutOfRange { option: usize, available: usize },
    #[error("already on the last question")]
    LastQuestion,
    #[error("answers can only be submitted from the last question")]
    NotLastQuestion,
    #[error("no open session")]
    Closed,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Grading(#[from] GradeError),
}
