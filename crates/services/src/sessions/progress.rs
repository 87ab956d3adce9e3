use quiz_core::model::{AnswerChoice, Question, SessionId};

/// Lifecycle phase of an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// A question is active and its timer may be running.
    InProgress,
    /// The answer set is frozen while the grader runs.
    Submitting,
    /// Terminal; the result is stored.
    Completed,
}

/// Point-in-time view of a session, useful for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub index: usize,
    pub total: usize,
    pub question: Question,
    pub remaining_ticks: u32,
    pub selected: Option<AnswerChoice>,
    pub timed_out: bool,
    pub answered: usize,
    pub phase: SessionPhase,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}
