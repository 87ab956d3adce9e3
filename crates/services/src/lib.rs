#![forbid(unsafe_code)]

pub mod error;
pub mod grading;
pub mod sessions;

pub use quiz_core::Clock;

pub use error::{GradeError, SessionError};
pub use grading::{AnswerKeyGrader, DEFAULT_PASS_THRESHOLD_PERCENT, Grader};

pub use sessions::{
    Advance, AssessmentController, AssessmentHooks, AssessmentSession, ControllerStatus,
    NoopHooks, SessionEvent, SessionPhase, SessionSnapshot, SubmitRequest, TickOutcome,
};
