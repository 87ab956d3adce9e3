#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::AssessmentConfig;
use quiz_core::model::{
    AssessmentResult, CategoryId, Question, QuestionId, SessionId, SubmittedAnswer,
};
use quiz_core::time::fixed_clock;
use services::{
    AnswerKeyGrader, AssessmentController, AssessmentHooks, GradeError, Grader, SessionEvent,
};
use storage::repository::{InMemoryQuestionBank, QuestionRecord};

pub const TICK: Duration = Duration::from_secs(1);

pub fn config(budget: u32) -> AssessmentConfig {
    AssessmentConfig::new(budget, 20, TICK).unwrap()
}

pub fn qid(id: &str) -> QuestionId {
    QuestionId::new(id)
}

/// Bank with one category of `count` questions named `<category>-<n>`; the
/// correct option is always 0.
pub fn bank(category: &str, count: usize) -> InMemoryQuestionBank {
    let records = (1..=count)
        .map(|n| {
            let question = Question::new(
                QuestionId::new(format!("{category}-{n}")),
                format!("Question {n}"),
                vec!["right".into(), "wrong".into(), "also wrong".into()],
            )
            .unwrap();
            QuestionRecord::new(question, 0)
        })
        .collect();
    let bank = InMemoryQuestionBank::new().with_shuffle(false);
    bank.insert_category(CategoryId::new(category), records)
        .unwrap();
    bank
}

/// Grades with an answer key, counting calls and optionally failing or
/// stalling.
pub struct FakeGrader {
    inner: AnswerKeyGrader,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
    received: Mutex<Vec<Vec<SubmittedAnswer>>>,
}

impl FakeGrader {
    pub fn new(bank: &InMemoryQuestionBank) -> Self {
        Self {
            inner: AnswerKeyGrader::new(bank.answer_key().unwrap()),
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_answers(&self) -> Option<Vec<SubmittedAnswer>> {
        self.received.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Grader for FakeGrader {
    async fn grade(&self, answers: &[SubmittedAnswer]) -> Result<AssessmentResult, GradeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(answers.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GradeError::Unavailable("grader offline".into()));
        }
        self.inner.grade(answers).await
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<SessionEvent>>,
    completions: Mutex<Vec<(SessionId, AssessmentResult)>>,
    closes: AtomicUsize,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn completions(&self) -> Vec<(SessionId, AssessmentResult)> {
        self.completions.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn timed_out(&self) -> Vec<QuestionId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::TimedOut { question_id } => Some(question_id),
                _ => None,
            })
            .collect()
    }

    pub fn ticks_for(&self, question_id: &QuestionId) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Tick {
                    question_id: id,
                    remaining_ticks,
                } if &id == question_id => Some(remaining_ticks),
                _ => None,
            })
            .collect()
    }
}

impl AssessmentHooks for RecordingHooks {
    fn on_event(&self, _session_id: SessionId, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_complete(&self, session_id: SessionId, result: &AssessmentResult) {
        self.completions
            .lock()
            .unwrap()
            .push((session_id, result.clone()));
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub controller: AssessmentController,
    pub grader: Arc<FakeGrader>,
    pub hooks: Arc<RecordingHooks>,
}

pub fn harness(bank: InMemoryQuestionBank, grader: FakeGrader, budget: u32) -> Harness {
    let grader = Arc::new(grader);
    let hooks = Arc::new(RecordingHooks::default());
    let controller = AssessmentController::new(Arc::new(bank), grader.clone(), config(budget))
        .with_hooks(hooks.clone())
        .with_clock(fixed_clock());
    Harness {
        controller,
        grader,
        hooks,
    }
}

/// Sleep for `ticks` timer intervals plus half an interval, so every tick due
/// in that window has been delivered.
pub async fn wait_ticks(ticks: u32) {
    tokio::time::sleep(TICK * ticks + TICK / 2).await;
}
