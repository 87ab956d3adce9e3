mod common;

use std::time::Duration;

use common::{FakeGrader, bank, harness, qid, wait_ticks};
use quiz_core::model::{AnswerChoice, CategoryId};
use services::{ControllerStatus, GradeError, SessionError, SessionEvent, SessionPhase};
use storage::repository::LoadError;

#[tokio::test(start_paused = true)]
async fn answered_skipped_answered_submits_once() {
    let bank = bank("rust", 3);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    let first = h.controller.open(&CategoryId::new("rust")).await.unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.total, 3);
    assert_eq!(h.controller.status(), ControllerStatus::InProgress);

    h.controller.select_answer(&qid("rust-1"), 0).await.unwrap();
    h.controller.advance().await.unwrap();

    wait_ticks(3).await;
    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 2);
    assert_eq!(h.hooks.timed_out(), vec![qid("rust-2")]);

    h.controller.select_answer(&qid("rust-3"), 1).await.unwrap();
    let result = h.controller.submit().await.unwrap();

    let selected: Vec<_> = result
        .per_question()
        .iter()
        .map(|outcome| outcome.selected_answer)
        .collect();
    assert_eq!(
        selected,
        vec![
            AnswerChoice::Selected(0),
            AnswerChoice::Unanswered,
            AnswerChoice::Selected(1),
        ]
    );
    assert_eq!(result.correct_count(), 1);
    assert_eq!(h.grader.calls(), 1);
    assert_eq!(h.hooks.completions().len(), 1);
    assert_eq!(h.controller.status(), ControllerStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn untouched_session_times_out_and_auto_submits() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    wait_ticks(6).await;

    assert_eq!(h.grader.calls(), 1);
    let answers = h.grader.last_answers().unwrap();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a.selected == AnswerChoice::Unanswered));
    assert_eq!(h.hooks.timed_out(), vec![qid("rust-1"), qid("rust-2")]);

    let completions = h.hooks.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].1.score(), 0.0);
    assert!(!completions[0].1.passed());
    assert_eq!(h.controller.status(), ControllerStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn each_question_runs_for_exactly_the_budget() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 4);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    wait_ticks(3).await;
    assert_eq!(h.controller.snapshot().await.unwrap().index, 0);

    tokio::time::sleep(Duration::from_millis(700)).await;
    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 1);
    assert_eq!(snapshot.remaining_ticks, 4);
    assert_eq!(h.hooks.ticks_for(&qid("rust-1")), vec![3, 2, 1]);
}

#[tokio::test(start_paused = true)]
async fn go_back_leaves_everything_untouched() {
    let bank = bank("rust", 3);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 5);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    h.controller.select_answer(&qid("rust-1"), 2).await.unwrap();
    h.controller.advance().await.unwrap();
    h.controller.select_answer(&qid("rust-2"), 1).await.unwrap();
    wait_ticks(1).await;

    let before = h.controller.snapshot().await.unwrap();
    assert_eq!(h.controller.go_back().await.unwrap(), 1);
    let after = h.controller.snapshot().await.unwrap();

    assert_eq!(before, after);
    assert_eq!(after.remaining_ticks, 4);
    assert_eq!(after.selected, Some(AnswerChoice::Selected(1)));
    let err = h.controller.select_answer(&qid("rust-1"), 0).await.unwrap_err();
    assert!(matches!(err, SessionError::NotCurrent { .. }));
}

#[tokio::test(start_paused = true)]
async fn missing_category_never_starts_and_closes() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    let err = h
        .controller
        .open(&CategoryId::new("cooking"))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Load(LoadError::NotFound));
    assert_eq!(h.controller.status(), ControllerStatus::Idle);
    assert_eq!(h.hooks.closes(), 1);
    assert!(h.hooks.events().is_empty());
    assert_eq!(
        h.controller.snapshot().await.unwrap_err(),
        SessionError::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_category_is_invalid_input() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    let err = h
        .controller
        .open(&CategoryId::new("no spaces allowed"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::InvalidInput(_))));
    assert_eq!(h.hooks.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn answer_before_the_final_tick_is_kept() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    wait_ticks(2).await;
    h.controller.select_answer(&qid("rust-1"), 1).await.unwrap();
    h.controller.select_answer(&qid("rust-1"), 0).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 1);
    assert!(h.hooks.timed_out().is_empty());

    h.controller.select_answer(&qid("rust-2"), 0).await.unwrap();
    let result = h.controller.submit().await.unwrap();
    assert_eq!(
        result.per_question()[0].selected_answer,
        AnswerChoice::Selected(0)
    );
    assert!(result.passed());
}

#[tokio::test(start_paused = true)]
async fn advancing_invalidates_the_old_timer() {
    let bank = bank("rust", 3);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 3);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    wait_ticks(2).await;
    h.controller.advance().await.unwrap();

    // The old timer would have expired at 3s; the new one ticks at 3.5s.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.index, 1);
    assert_eq!(snapshot.remaining_ticks, 2);
    assert!(h.hooks.timed_out().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submit_is_only_offered_on_the_last_question() {
    let bank = bank("rust", 2);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 10);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    assert_eq!(
        h.controller.submit().await.unwrap_err(),
        SessionError::NotLastQuestion
    );
    h.controller.advance().await.unwrap();
    assert_eq!(
        h.controller.advance().await.unwrap_err(),
        SessionError::LastQuestion
    );
    assert_eq!(h.grader.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_submits_share_one_grading_call() {
    let bank = bank("rust", 1);
    let grader = FakeGrader::new(&bank).with_delay(Duration::from_secs(2));
    let mut h = harness(bank, grader, 30);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    h.controller.select_answer(&qid("rust-1"), 0).await.unwrap();

    let (a, b) = tokio::join!(h.controller.submit(), h.controller.submit());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(h.grader.calls(), 1);
    assert_eq!(h.hooks.completions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_after_completion_returns_stored_result() {
    let bank = bank("rust", 1);
    let grader = FakeGrader::new(&bank);
    let mut h = harness(bank, grader, 30);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    let first = h.controller.submit().await.unwrap();
    let second = h.controller.submit().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.grader.calls(), 1);
    assert_eq!(h.hooks.completions().len(), 1);
    assert_eq!(
        h.controller.select_answer(&qid("rust-1"), 0).await.unwrap_err(),
        SessionError::NotInProgress
    );
}

#[tokio::test(start_paused = true)]
async fn grading_failure_allows_resubmission() {
    let bank = bank("rust", 1);
    let grader = FakeGrader::new(&bank).failing_first(1);
    let mut h = harness(bank, grader, 30);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    h.controller.select_answer(&qid("rust-1"), 0).await.unwrap();

    let err = h.controller.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Grading(GradeError::Unavailable(_))
    ));
    assert_eq!(h.controller.status(), ControllerStatus::InProgress);
    assert!(h.hooks.events().iter().any(|event| matches!(
        event,
        SessionEvent::SubmissionFailed { .. }
    )));

    let result = h.controller.submit().await.unwrap();
    assert!(result.passed());
    assert_eq!(h.grader.calls(), 2);
    assert_eq!(h.hooks.completions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_answer_after_failed_auto_submit_is_accepted() {
    let bank = bank("rust", 1);
    let grader = FakeGrader::new(&bank).failing_first(1);
    let mut h = harness(bank, grader, 2);

    h.controller.open(&CategoryId::new("rust")).await.unwrap();
    wait_ticks(2).await;

    assert_eq!(h.grader.calls(), 1);
    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::InProgress);
    assert!(snapshot.timed_out);

    h.controller.select_answer(&qid("rust-1"), 0).await.unwrap();
    assert!(!h.controller.snapshot().await.unwrap().timed_out);

    let result = h.controller.submit().await.unwrap();
    assert_eq!(result.correct_count(), 1);
    assert_eq!(h.grader.calls(), 2);
}
