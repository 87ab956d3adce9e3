use quiz_core::model::{AssessmentResult, Question, QuestionId, SessionId, SubmittedAnswer};

use crate::error::GradeError;

/// Notifications pushed to the hosting application while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A question became active with a fresh countdown.
    QuestionStarted {
        index: usize,
        total: usize,
        question: Question,
        remaining_ticks: u32,
    },
    /// The countdown moved; `remaining_ticks` is never zero here.
    Tick {
        question_id: QuestionId,
        remaining_ticks: u32,
    },
    /// The question expired with no answer and was recorded as unanswered.
    TimedOut { question_id: QuestionId },
    /// The resolved answer list went to the grader.
    SubmissionStarted { answers: Vec<SubmittedAnswer> },
    /// Grading failed; the session reopened on the last question.
    SubmissionFailed { error: GradeError },
    /// Grading succeeded and the session is complete.
    Completed { result: AssessmentResult },
}

/// Callbacks invoked by the controller.
///
/// Called from the controller and from its session task, so implementations
/// should return quickly.
pub trait AssessmentHooks: Send + Sync {
    fn on_event(&self, _session_id: SessionId, _event: &SessionEvent) {}

    /// Called exactly once per session that completes.
    fn on_complete(&self, _session_id: SessionId, _result: &AssessmentResult) {}

    /// Called when an assessment ends without a result: closed early, or it
    /// could not be opened at all.
    fn on_close(&self) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl AssessmentHooks for NoopHooks {}
