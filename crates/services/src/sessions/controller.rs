use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{
    AssessmentResult, CategoryId, Question, QuestionId, SessionId, SubmittedAnswer,
};
use quiz_core::{AssessmentConfig, Clock};
use storage::repository::{LoadError, QuestionSource};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument, debug, info, info_span, warn};

use super::events::{AssessmentHooks, NoopHooks, SessionEvent};
use super::progress::{SessionPhase, SessionSnapshot};
use super::state::{Advance, AssessmentSession, SubmitRequest, TickOutcome};
use super::timer::{QuestionTimer, TaskGuard, TimerTick};
use crate::error::{GradeError, SessionError};
use crate::grading::Grader;

const COMMAND_BUFFER: usize = 32;

/// Coarse lifecycle of the controller as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// No session is open.
    Idle,
    /// Questions are being fetched.
    Loading,
    /// A session is running, including while its answers are being graded.
    InProgress,
    /// The open session holds its result.
    Completed,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Select {
        question_id: QuestionId,
        option: usize,
        reply: Reply<()>,
    },
    Advance {
        reply: Reply<Advance>,
    },
    GoBack {
        reply: oneshot::Sender<usize>,
    },
    Submit {
        reply: Reply<AssessmentResult>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Tick(TimerTick),
    Graded {
        outcome: Result<AssessmentResult, GradeError>,
    },
    /// Stops the actor; the reply says whether the session had completed.
    Close {
        reply: oneshot::Sender<bool>,
    },
}

impl From<TimerTick> for Command {
    fn from(tick: TimerTick) -> Self {
        Self::Tick(tick)
    }
}

struct ActiveSession {
    id: SessionId,
    commands: mpsc::Sender<Command>,
    phase: watch::Receiver<SessionPhase>,
    _actor: TaskGuard,
}

/// Drives one timed assessment at a time.
///
/// Every trigger (user commands, timer ticks, the grader's answer) is funneled
/// through a single task that owns the [`AssessmentSession`], so no two
/// transitions ever run concurrently.
pub struct AssessmentController {
    source: Arc<dyn QuestionSource>,
    grader: Arc<dyn Grader>,
    hooks: Arc<dyn AssessmentHooks>,
    config: AssessmentConfig,
    clock: Clock,
    loading: bool,
    active: Option<ActiveSession>,
}

impl AssessmentController {
    #[must_use]
    pub fn new(
        source: Arc<dyn QuestionSource>,
        grader: Arc<dyn Grader>,
        config: AssessmentConfig,
    ) -> Self {
        Self {
            source,
            grader,
            hooks: Arc::new(NoopHooks),
            config,
            clock: Clock::default(),
            loading: false,
            active: None,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn AssessmentHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        if self.loading {
            return ControllerStatus::Loading;
        }
        match &self.active {
            None => ControllerStatus::Idle,
            Some(active) => match *active.phase.borrow() {
                SessionPhase::Completed => ControllerStatus::Completed,
                SessionPhase::InProgress | SessionPhase::Submitting => {
                    ControllerStatus::InProgress
                }
            },
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Load questions for `category` and start a fresh session on the first one.
    ///
    /// Any previously open session is closed first. When loading fails the
    /// close hook fires and the controller goes back to idle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the loader fails or finds no
    /// questions, and `SessionError::DuplicateQuestion` for a sequence that
    /// repeats an id.
    pub async fn open(&mut self, category: &CategoryId) -> Result<SessionSnapshot, SessionError> {
        self.close().await;
        self.loading = true;
        let loaded = self.load(category).await;
        self.loading = false;

        let session = match loaded
            .and_then(|questions| AssessmentSession::new(questions, &self.config, self.clock.now()))
        {
            Ok(session) => session,
            Err(err) => {
                warn!(%category, error = %err, "assessment could not be opened");
                self.hooks.on_close();
                return Err(err);
            }
        };

        let snapshot = session.snapshot();
        let id = session.id();
        info!(%category, session_id = %id, total = snapshot.total, "assessment opened");

        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (phase_tx, phase_rx) = watch::channel(session.phase());
        let timer = QuestionTimer::start(
            session.generation(),
            self.config.tick_interval(),
            commands.clone(),
        );
        self.hooks.on_event(
            id,
            &SessionEvent::QuestionStarted {
                index: snapshot.index,
                total: snapshot.total,
                question: snapshot.question.clone(),
                remaining_ticks: snapshot.remaining_ticks,
            },
        );

        let actor = SessionActor {
            session,
            grader: Arc::clone(&self.grader),
            hooks: Arc::clone(&self.hooks),
            clock: self.clock,
            tick_interval: self.config.tick_interval(),
            commands: commands.clone(),
            phase: phase_tx,
            timer: Some(timer),
            grading: None,
            waiters: Vec::new(),
        };
        let span = info_span!("assessment", session_id = %id, %category);
        let handle = tokio::spawn(actor.run(inbox).instrument(span));

        self.active = Some(ActiveSession {
            id,
            commands,
            phase: phase_rx,
            _actor: TaskGuard::new(handle),
        });
        Ok(snapshot)
    }

    async fn load(&self, category: &CategoryId) -> Result<Vec<Question>, SessionError> {
        let desired = self.config.target_question_count();
        let mut questions = self.source.fetch_questions(category, desired).await?;
        if questions.is_empty() {
            return Err(LoadError::NotFound.into());
        }
        questions.truncate(usize::try_from(desired).unwrap_or(usize::MAX));
        Ok(questions)
    }

    /// Record an answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` without an open session, otherwise the
    /// session's validation error.
    pub async fn select_answer(
        &self,
        question_id: &QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        let question_id = question_id.clone();
        self.request(|reply| Command::Select {
            question_id,
            option,
            reply,
        })
        .await?
    }

    /// Move to the next question and restart the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LastQuestion` on the final question.
    pub async fn advance(&self) -> Result<Advance, SessionError> {
        self.request(|reply| Command::Advance { reply }).await?
    }

    /// Never moves; returns the index the session is still on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` without an open session.
    pub async fn go_back(&self) -> Result<usize, SessionError> {
        self.request(|reply| Command::GoBack { reply }).await
    }

    /// Submit the resolved answer list and wait for the grader.
    ///
    /// Concurrent callers share one grading call. After completion this
    /// returns the stored result without grading again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLastQuestion` before the final question and
    /// `SessionError::Grading` when the grader fails; the session stays open
    /// for another attempt in that case.
    pub async fn submit(&self) -> Result<AssessmentResult, SessionError> {
        self.request(|reply| Command::Submit { reply }).await?
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` without an open session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Discard the open session, if any. Safe to call in any state.
    ///
    /// The session task settles whether the session completed, so exactly one
    /// of `on_complete` and `on_close` fires even while grading is finishing.
    pub async fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let (reply, response) = oneshot::channel();
        let completed = match active.commands.send(Command::Close { reply }).await {
            Ok(()) => response.await.ok(),
            Err(_) => None,
        };
        let completed = match completed {
            Some(completed) => completed,
            None => {
                // The task is gone; its last published phase is final.
                let completed = *active.phase.borrow() == SessionPhase::Completed;
                if !completed {
                    self.hooks.on_close();
                }
                completed
            }
        };
        drop(active);
        info!(completed, "assessment closed");
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::Closed)?;
        let (reply, response) = oneshot::channel();
        active
            .commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

//
// ─── ACTOR ─────────────────────────────────────────────────────────────────────
//

struct SessionActor {
    session: AssessmentSession,
    grader: Arc<dyn Grader>,
    hooks: Arc<dyn AssessmentHooks>,
    clock: Clock,
    tick_interval: Duration,
    commands: mpsc::Sender<Command>,
    phase: watch::Sender<SessionPhase>,
    timer: Option<QuestionTimer>,
    grading: Option<TaskGuard>,
    waiters: Vec<Reply<AssessmentResult>>,
}

impl SessionActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        while let Some(command) = inbox.recv().await {
            let flow = self.handle(command);
            self.publish();
            if flow.is_break() {
                break;
            }
        }
    }

    fn publish(&self) {
        self.phase.send_replace(self.session.phase());
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Select {
                question_id,
                option,
                reply,
            } => {
                let _ = reply.send(self.session.select_answer(&question_id, option));
            }
            Command::Advance { reply } => {
                let outcome = self.session.advance();
                if let Ok(next) = &outcome {
                    info!(index = next.index, question_id = %next.question_id, "advanced");
                    self.start_question(next);
                }
                let _ = reply.send(outcome);
            }
            Command::GoBack { reply } => {
                debug!("backward navigation ignored");
                let _ = reply.send(self.session.go_back());
            }
            Command::Submit { reply } => self.submit(reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            Command::Tick(tick) => self.tick(tick),
            Command::Graded { outcome } => self.graded(outcome),
            Command::Close { reply } => {
                self.close(reply);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn close(&mut self, reply: oneshot::Sender<bool>) {
        let completed = self.session.phase() == SessionPhase::Completed;
        self.timer = None;
        self.grading = None;
        if !completed {
            self.hooks.on_close();
        }
        let _ = reply.send(completed);
    }

    fn emit(&self, event: &SessionEvent) {
        self.hooks.on_event(self.session.id(), event);
    }

    fn start_question(&mut self, next: &Advance) {
        self.timer = Some(QuestionTimer::start(
            next.generation,
            self.tick_interval,
            self.commands.clone(),
        ));
        let snapshot = self.session.snapshot();
        self.emit(&SessionEvent::QuestionStarted {
            index: snapshot.index,
            total: snapshot.total,
            question: snapshot.question,
            remaining_ticks: snapshot.remaining_ticks,
        });
    }

    fn tick(&mut self, tick: TimerTick) {
        match self.session.tick(tick.generation) {
            TickOutcome::Stale => {
                let active = self.timer.as_ref().map(QuestionTimer::generation);
                debug!(generation = tick.generation, ?active, "dropping stale tick");
            }
            TickOutcome::Running { remaining } => {
                let question_id = self.session.current_question().id().clone();
                self.emit(&SessionEvent::Tick {
                    question_id,
                    remaining_ticks: remaining,
                });
            }
            TickOutcome::Advanced {
                expired,
                timed_out,
                next,
            } => {
                self.expired(expired, timed_out);
                info!(index = next.index, question_id = %next.question_id, "advanced on timeout");
                self.start_question(&next);
            }
            TickOutcome::SubmitDue {
                expired,
                timed_out,
                answers,
            } => {
                self.expired(expired, timed_out);
                self.timer = None;
                info!("last question expired, submitting");
                self.start_grading(answers);
            }
        }
    }

    fn expired(&self, question_id: QuestionId, timed_out: bool) {
        if timed_out {
            debug!(%question_id, "question timed out");
            self.emit(&SessionEvent::TimedOut { question_id });
        }
    }

    fn submit(&mut self, reply: Reply<AssessmentResult>) {
        match self.session.request_submission() {
            Ok(SubmitRequest::Start(answers)) => {
                self.waiters.push(reply);
                self.start_grading(answers);
            }
            Ok(SubmitRequest::InFlight) => self.waiters.push(reply),
            Ok(SubmitRequest::AlreadyCompleted(result)) => {
                let _ = reply.send(Ok(result));
            }
            Err(err) => {
                let _ = reply.send(Err(err));
            }
        }
    }

    fn start_grading(&mut self, answers: Vec<SubmittedAnswer>) {
        self.emit(&SessionEvent::SubmissionStarted {
            answers: answers.clone(),
        });

        let grader = Arc::clone(&self.grader);
        let commands = self.commands.clone();
        let handle = tokio::spawn(
            async move {
                let outcome = grader.grade(&answers).await;
                let _ = commands.send(Command::Graded { outcome }).await;
            }
            .in_current_span(),
        );
        self.grading = Some(TaskGuard::new(handle));
    }

    fn graded(&mut self, outcome: Result<AssessmentResult, GradeError>) {
        self.grading = None;
        match self.session.finish_submission(outcome, self.clock.now()) {
            Ok(result) => {
                self.timer = None;
                info!(
                    score = result.score(),
                    correct = result.correct_count(),
                    total = result.total_questions(),
                    passed = result.passed(),
                    "assessment completed"
                );
                self.emit(&SessionEvent::Completed {
                    result: result.clone(),
                });
                self.hooks.on_complete(self.session.id(), &result);
                self.publish();
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(Ok(result.clone()));
                }
            }
            Err(err) => {
                warn!(error = %err, "grading failed, session reopened");
                self.publish();
                if let SessionError::Grading(error) = &err {
                    self.emit(&SessionEvent::SubmissionFailed {
                        error: error.clone(),
                    });
                }
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(Err(err.clone()));
                }
            }
        }
    }
}
