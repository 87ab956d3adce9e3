use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;

use quiz_core::AssessmentConfig;
use quiz_core::model::{
    AnswerChoice, AssessmentResult, Question, QuestionId, SessionId, SubmittedAnswer,
};

use super::progress::{SessionPhase, SessionSnapshot};
use crate::error::{GradeError, SessionError};

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Input to the session state machine.
#[derive(Debug)]
pub(crate) enum Trigger {
    /// The current question's timer reached zero.
    Expire,
    /// The candidate pressed "Next".
    Next,
    /// The candidate pressed "Submit".
    Submit,
    /// The grader answered.
    Graded {
        outcome: Result<AssessmentResult, GradeError>,
        at: DateTime<Utc>,
    },
}

/// Effect of a successful transition.
#[derive(Debug)]
pub(crate) enum Step {
    Advanced(Advance),
    SubmissionStarted(Vec<SubmittedAnswer>),
    SubmissionInFlight,
    AlreadyCompleted(AssessmentResult),
    Completed(AssessmentResult),
    Reopened(GradeError),
}

/// A move to the next question. The timer must be rebound to `generation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub index: usize,
    pub question_id: QuestionId,
    pub generation: u64,
}

/// What a timer tick did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a timer that is no longer current, or the session
    /// is not counting down.
    Stale,
    Running {
        remaining: u32,
    },
    /// The question expired and the next one is now active.
    Advanced {
        expired: QuestionId,
        timed_out: bool,
        next: Advance,
    },
    /// The last question expired; the answer set must be graded.
    SubmitDue {
        expired: QuestionId,
        timed_out: bool,
        answers: Vec<SubmittedAnswer>,
    },
}

/// Result of asking to submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    /// Grading must be started with this resolved list.
    Start(Vec<SubmittedAnswer>),
    /// A grading call is already running; wait for it.
    InFlight,
    /// Nothing to do; the stored result stands.
    AlreadyCompleted(AssessmentResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single source of truth for one timed assessment run.
///
/// Steps forward through a fixed question sequence, one countdown per
/// question. Navigation never goes back, and an answer is frozen once its
/// question is passed. The owner drives it with [`tick`](Self::tick) and the
/// user commands; it holds no timer itself, only the generation number the
/// live timer must present.
pub struct AssessmentSession {
    id: SessionId,
    questions: Vec<Question>,
    time_budget: u32,
    current: usize,
    remaining: u32,
    generation: u64,
    answers: HashMap<QuestionId, AnswerChoice>,
    timed_out: HashSet<QuestionId>,
    visited: HashSet<QuestionId>,
    phase: SessionPhase,
    pending: Option<Vec<SubmittedAnswer>>,
    result: Option<AssessmentResult>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    /// Start a session on question 0 with a full time budget.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided and
    /// `SessionError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        questions: Vec<Question>,
        config: &AssessmentConfig,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let Some(first) = questions.first() else {
            return Err(SessionError::Empty);
        };
        let mut visited = HashSet::new();
        visited.insert(first.id().clone());

        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id())) {
            return Err(SessionError::DuplicateQuestion {
                question_id: dup.id().clone(),
            });
        }

        Ok(Self {
            id: SessionId::generate(),
            time_budget: config.time_budget_ticks(),
            remaining: config.time_budget_ticks(),
            current: 0,
            generation: 1,
            answers: HashMap::new(),
            timed_out: HashSet::new(),
            visited,
            phase: SessionPhase::InProgress,
            pending: None,
            result: None,
            started_at,
            completed_at: None,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<AnswerChoice> {
        self.answers.get(question_id).copied()
    }

    #[must_use]
    pub fn timed_out(&self) -> &HashSet<QuestionId> {
        &self.timed_out
    }

    #[must_use]
    pub fn visited(&self) -> &HashSet<QuestionId> {
        &self.visited
    }

    #[must_use]
    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Number of questions holding a real selection.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_answered()).count()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question();
        SessionSnapshot {
            session_id: self.id,
            index: self.current,
            total: self.questions.len(),
            question: question.clone(),
            remaining_ticks: self.remaining,
            selected: self.answer_for(question.id()),
            timed_out: self.timed_out.contains(question.id()),
            answered: self.answered_count(),
            phase: self.phase,
        }
    }

    /// Every question's answer in sequence order, backfilling the sentinel.
    #[must_use]
    pub fn resolved_answers(&self) -> Vec<SubmittedAnswer> {
        self.questions
            .iter()
            .map(|q| {
                let selected = self.answer_for(q.id()).unwrap_or(AnswerChoice::Unanswered);
                SubmittedAnswer::new(q.id().clone(), selected)
            })
            .collect()
    }

    /// Record or overwrite the answer to the current question.
    ///
    /// Clears a timed-out mark left on the question: until navigation moves
    /// on, a late answer still counts. The countdown is not touched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` unless the session is in progress,
    /// `SessionError::NotCurrent` for any other question and
    /// `SessionError::OptionOutOfRange` for an option the question lacks.
    pub fn select_answer(
        &mut self,
        question_id: &QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let question = self.current_question();
        if question.id() != question_id {
            return Err(SessionError::NotCurrent {
                question_id: question_id.clone(),
            });
        }
        if !question.has_option(option) {
            return Err(SessionError::OptionOutOfRange {
                option,
                available: question.option_count(),
            });
        }

        self.answers
            .insert(question_id.clone(), AnswerChoice::Selected(option));
        self.timed_out.remove(question_id);
        Ok(())
    }

    /// Count down one tick of the timer identified by `generation`.
    ///
    /// On expiry the live answer map decides whether the question timed out,
    /// so an answer recorded just before this call is honored.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if self.phase != SessionPhase::InProgress
            || generation != self.generation
            || self.remaining == 0
        {
            return TickOutcome::Stale;
        }

        self.remaining -= 1;
        if self.remaining > 0 {
            return TickOutcome::Running {
                remaining: self.remaining,
            };
        }

        let expired = self.current_question().id().clone();
        let timed_out = !self
            .answer_for(&expired)
            .is_some_and(AnswerChoice::is_answered);
        if timed_out {
            self.timed_out.insert(expired.clone());
            self.answers.insert(expired.clone(), AnswerChoice::Unanswered);
        }

        match self.transition(Trigger::Expire) {
            Ok(Step::Advanced(next)) => TickOutcome::Advanced {
                expired,
                timed_out,
                next,
            },
            Ok(Step::SubmissionStarted(answers)) => TickOutcome::SubmitDue {
                expired,
                timed_out,
                answers,
            },
            _ => TickOutcome::Stale,
        }
    }

    /// Explicit "Next".
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LastQuestion` on the final question and
    /// `SessionError::NotInProgress` outside the in-progress phase.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.transition(Trigger::Next)? {
            Step::Advanced(advance) => Ok(advance),
            _ => Err(SessionError::NotInProgress),
        }
    }

    /// Backward navigation is not supported; answers are frozen once passed.
    pub fn go_back(&self) -> usize {
        self.current
    }

    /// Ask to submit. At most one grading call is ever in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLastQuestion` before the final question.
    pub fn request_submission(&mut self) -> Result<SubmitRequest, SessionError> {
        match self.transition(Trigger::Submit)? {
            Step::SubmissionStarted(answers) => Ok(SubmitRequest::Start(answers)),
            Step::AlreadyCompleted(result) => Ok(SubmitRequest::AlreadyCompleted(result)),
            _ => Ok(SubmitRequest::InFlight),
        }
    }

    /// Apply the grader's answer to the in-flight submission.
    ///
    /// On success the session completes. On failure it reopens on the same
    /// question so the candidate may submit again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` if no submission is in flight,
    /// or `SessionError::Grading` with the failure that reopened the session.
    pub fn finish_submission(
        &mut self,
        outcome: Result<AssessmentResult, GradeError>,
        at: DateTime<Utc>,
    ) -> Result<AssessmentResult, SessionError> {
        match self.transition(Trigger::Graded { outcome, at })? {
            Step::Completed(result) => Ok(result),
            Step::Reopened(err) => Err(SessionError::Grading(err)),
            _ => Err(SessionError::NotInProgress),
        }
    }

    /// The one place phase and question index change.
    ///
    /// | from          | trigger      | to                      |
    /// |---------------|--------------|-------------------------|
    /// | Active(i<N-1) | Expire, Next | Active(i+1)             |
    /// | Active(N-1)   | Expire       | Submitting              |
    /// | Active(N-1)   | Submit       | Submitting              |
    /// | Submitting    | Graded ok    | Completed               |
    /// | Submitting    | Graded err   | Active(i)               |
    /// | Completed     | Submit       | Completed (no-op)       |
    pub(crate) fn transition(&mut self, trigger: Trigger) -> Result<Step, SessionError> {
        match (self.phase, trigger) {
            (SessionPhase::Completed, Trigger::Submit) => {
                let result = self.result.clone().ok_or(SessionError::NotInProgress)?;
                Ok(Step::AlreadyCompleted(result))
            }
            (SessionPhase::Submitting, Trigger::Submit) => Ok(Step::SubmissionInFlight),
            (SessionPhase::Submitting, Trigger::Graded { outcome, at }) => {
                Ok(self.apply_grade(outcome, at))
            }
            (SessionPhase::InProgress, Trigger::Expire | Trigger::Next) if !self.is_last() => {
                Ok(Step::Advanced(self.move_next()))
            }
            (SessionPhase::InProgress, Trigger::Expire | Trigger::Submit) if self.is_last() => {
                Ok(Step::SubmissionStarted(self.freeze_answers()))
            }
            (SessionPhase::InProgress, Trigger::Next) => Err(SessionError::LastQuestion),
            (SessionPhase::InProgress, Trigger::Submit) => Err(SessionError::NotLastQuestion),
            _ => Err(SessionError::NotInProgress),
        }
    }

    fn move_next(&mut self) -> Advance {
        self.current += 1;
        self.remaining = self.time_budget;
        self.generation += 1;
        let question_id = self.current_question().id().clone();
        self.visited.insert(question_id.clone());
        Advance {
            index: self.current,
            question_id,
            generation: self.generation,
        }
    }

    fn freeze_answers(&mut self) -> Vec<SubmittedAnswer> {
        let answers = self.resolved_answers();
        self.pending = Some(answers.clone());
        self.phase = SessionPhase::Submitting;
        answers
    }

    fn apply_grade(
        &mut self,
        outcome: Result<AssessmentResult, GradeError>,
        at: DateTime<Utc>,
    ) -> Step {
        let submitted = self.pending.take().unwrap_or_default();
        let outcome = outcome.and_then(|result| {
            if result.matches_submission(&submitted) {
                Ok(result)
            } else {
                Err(GradeError::MismatchedResult)
            }
        });

        match outcome {
            Ok(result) => {
                self.phase = SessionPhase::Completed;
                self.completed_at = Some(at);
                self.result = Some(result.clone());
                Step::Completed(result)
            }
            Err(err) => {
                self.phase = SessionPhase::InProgress;
                Step::Reopened(err)
            }
        }
    }
}

impl fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("remaining", &self.remaining)
            .field("generation", &self.generation)
            .field("answers_len", &self.answers.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
