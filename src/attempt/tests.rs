use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::attempt::{
    AnswerDraft, AttemptController, AttemptError, AutoConfirm, Confirmation, FinalizeMode,
    LoadOutcome, QuestionStatus, Route, SaveOutcome, SessionEvent, SessionPhase, SubmitOutcome,
};
use crate::core::config::AttemptSettings;
use crate::schemas::attempt::{AnswerPayload, QuestionType};
use crate::test_support::{
    admin_context, question, sample_snapshot, student_context, with_prior_choice, FakeAttemptApi,
};

type Harness = (Arc<AttemptController>, UnboundedReceiver<SessionEvent>, Arc<FakeAttemptApi>);

fn harness(remaining_seconds: i64) -> Harness {
    let api = FakeAttemptApi::new(sample_snapshot(remaining_seconds));
    harness_with(api, AttemptSettings::default())
}

fn harness_with(api: Arc<FakeAttemptApi>, settings: AttemptSettings) -> Harness {
    let (controller, events) =
        AttemptController::new(api.clone(), student_context(), "exam-1", settings);
    (controller, events, api)
}

async fn loaded(remaining_seconds: i64) -> Harness {
    let harness = harness(remaining_seconds);
    harness.0.load().await.expect("load");
    harness
}

fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn choice(ids: &[&str]) -> Option<AnswerDraft> {
    Some(AnswerDraft::Choice(ids.iter().map(|id| id.to_string()).collect()))
}

fn navigations(events: &[SessionEvent]) -> Vec<&Route> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Navigate(route) => Some(route),
            _ => None,
        })
        .collect()
}

struct Decline {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Confirmation for Decline {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().expect("prompts").push(prompt.to_string());
        false
    }
}

#[tokio::test]
async fn load_seeds_state_and_emits_loaded() {
    let mut snapshot = sample_snapshot(1800);
    snapshot.questions[1] =
        with_prior_choice(question("q2", QuestionType::MultipleCorrect), &["c"]);
    let (controller, mut events, api) =
        harness_with(FakeAttemptApi::new(snapshot), AttemptSettings::default());

    let outcome = controller.load().await.expect("load");
    assert_eq!(outcome, LoadOutcome::Loaded { question_count: 3, remaining_seconds: 1800 });
    assert_eq!(controller.phase(), SessionPhase::Active);
    assert_eq!(controller.current_index(), 0);
    assert_eq!(controller.draft("q2"), choice(&["c"]));
    assert_eq!(controller.save_status("q2"), Some(true));
    assert_eq!(
        controller.question_grid(),
        vec![QuestionStatus::NotAnswered, QuestionStatus::Saved, QuestionStatus::NotAnswered]
    );

    let drained = drain(&mut events);
    assert_eq!(
        drained.first(),
        Some(&SessionEvent::Loaded {
            title: "Mechanics Quiz".to_string(),
            question_count: 3,
            remaining_seconds: 1800,
        })
    );
    assert_eq!(api.fetch_count(), 1);
}

#[tokio::test]
async fn load_runs_once() {
    let (controller, _events, api) = loaded(1800).await;
    controller.set_choice("a").expect("choice");

    let again = controller.load().await.expect("second load");
    assert_eq!(again, LoadOutcome::AlreadyStarted);
    assert_eq!(api.fetch_count(), 1);
    assert_eq!(controller.draft("q1"), choice(&["a"]));
}

#[tokio::test]
async fn load_failure_moves_to_failed() {
    let api = FakeAttemptApi::new(sample_snapshot(1800));
    api.fail_fetch.store(true, std::sync::atomic::Ordering::SeqCst);
    let (controller, mut events, _api) = harness_with(api, AttemptSettings::default());

    let err = controller.load().await.expect_err("load must fail");
    assert!(matches!(err, AttemptError::Load(_)));
    assert_eq!(controller.phase(), SessionPhase::Failed);
    assert!(matches!(drain(&mut events).as_slice(), [SessionEvent::LoadFailed { .. }]));
    assert!(matches!(controller.set_choice("a"), Err(AttemptError::NotActive)));
    assert!(matches!(controller.submit(&AutoConfirm).await, Err(AttemptError::NotActive)));
}

#[tokio::test]
async fn only_candidates_can_load() {
    let api = FakeAttemptApi::new(sample_snapshot(1800));
    let (controller, _events) =
        AttemptController::new(api.clone(), admin_context(), "exam-1", AttemptSettings::default());

    assert!(matches!(controller.load().await, Err(AttemptError::NotCandidate)));
    assert_eq!(controller.phase(), SessionPhase::Failed);
    assert_eq!(api.fetch_count(), 0);
}

#[tokio::test]
async fn editing_before_load_is_rejected() {
    let (controller, _events, _api) = harness(1800);
    assert!(matches!(controller.set_choice("a"), Err(AttemptError::NotActive)));
    assert!(matches!(controller.save_and_next().await, Err(AttemptError::NotActive)));
}

#[tokio::test]
async fn single_correct_replaces_selection() {
    let (controller, _events, _api) = loaded(1800).await;

    controller.set_choice("a").expect("a");
    controller.set_choice("b").expect("b");
    assert_eq!(controller.draft("q1"), choice(&["b"]));
    assert_eq!(controller.save_status("q1"), Some(false));

    controller.set_choice("b").expect("b again");
    assert_eq!(controller.draft("q1"), choice(&["b"]));
}

#[tokio::test]
async fn multiple_correct_toggles_selection() {
    let (controller, _events, _api) = loaded(1800).await;
    controller.go_to(1).expect("go to q2");

    controller.set_choice("a").expect("a");
    controller.set_choice("c").expect("c");
    controller.set_choice("a").expect("toggle a");
    assert_eq!(controller.draft("q2"), choice(&["c"]));

    controller.set_choice("c").expect("toggle c");
    assert_eq!(controller.draft("q2"), choice(&[]));
}

#[tokio::test]
async fn answer_must_match_question_kind() {
    let (controller, _events, _api) = loaded(1800).await;

    assert!(matches!(
        controller.set_numerical("3"),
        Err(AttemptError::KindMismatch { operation: "set_numerical", .. })
    ));
    assert!(matches!(controller.set_choice("z"), Err(AttemptError::UnknownOption(_))));

    controller.go_to(2).expect("go to q3");
    assert!(matches!(
        controller.set_choice("a"),
        Err(AttemptError::KindMismatch { operation: "set_choice", .. })
    ));
    assert!(controller.draft("q1").is_none());
}

#[tokio::test]
async fn clear_forgets_answer_and_status() {
    let (controller, _events, _api) = loaded(1800).await;
    controller.set_choice("a").expect("a");
    controller.save_and_next().await.expect("save");
    controller.previous().expect("back");
    assert_eq!(controller.save_status("q1"), Some(true));

    controller.clear().expect("clear");
    assert!(controller.draft("q1").is_none());
    assert_eq!(controller.save_status("q1"), None);
    assert_eq!(controller.question_grid()[0], QuestionStatus::NotAnswered);
}

#[tokio::test]
async fn save_and_next_persists_and_advances() {
    let (controller, mut events, api) = loaded(1800).await;
    drain(&mut events);
    controller.go_to(1).expect("go to q2");
    controller.set_choice("c").expect("c");
    controller.set_choice("a").expect("a");

    let outcome = controller.save_and_next().await.expect("save");
    assert_eq!(
        outcome,
        SaveOutcome::Saved { question_id: "q2".to_string(), current_index: 2, confirmed: true }
    );
    assert_eq!(controller.save_status("q2"), Some(true));
    assert!(controller.view().last_saved_at.is_some());

    let saves = api.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(
        saves[0],
        (
            "q2".to_string(),
            AnswerPayload::Choice { selected_option_ids: vec!["a".to_string(), "c".to_string()] }
        )
    );
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::AnswerSaved { question_id: "q2".to_string() }]
    );
}

#[tokio::test]
async fn untouched_question_saves_as_empty() {
    let (controller, _events, api) = loaded(1800).await;

    controller.save_and_next().await.expect("save q1");
    controller.save_and_next().await.expect("save q2");
    controller.save_and_next().await.expect("save q3");

    let payloads: Vec<AnswerPayload> =
        api.saves().into_iter().map(|(_, payload)| payload).collect();
    assert_eq!(
        payloads,
        vec![
            AnswerPayload::Choice { selected_option_ids: vec![] },
            AnswerPayload::Choice { selected_option_ids: vec![] },
            AnswerPayload::Numerical { numerical_answer: None },
        ]
    );
}

#[tokio::test]
async fn save_and_next_stays_on_last_question() {
    let (controller, _events, api) = loaded(1800).await;
    controller.go_to(2).expect("go to q3");
    controller.set_numerical(" 9.81 ").expect("value");

    let outcome = controller.save_and_next().await.expect("save");
    assert!(matches!(outcome, SaveOutcome::Saved { current_index: 2, .. }));
    assert_eq!(controller.current_index(), 2);
    assert_eq!(api.saves()[0].1, AnswerPayload::Numerical { numerical_answer: Some(9.81) });
}

#[tokio::test]
async fn invalid_number_is_not_sent() {
    let (controller, _events, api) = loaded(1800).await;
    controller.go_to(2).expect("go to q3");
    controller.set_numerical("nine").expect("value");

    assert!(matches!(controller.save_and_next().await, Err(AttemptError::InvalidNumber(_))));
    assert!(api.saves().is_empty());
    assert_eq!(controller.save_status("q3"), Some(false));
    assert_eq!(controller.current_index(), 2);
    assert!(!controller.is_saving());
}

#[tokio::test]
async fn failed_save_keeps_question_dirty() {
    let (controller, mut events, api) = loaded(1800).await;
    drain(&mut events);
    api.fail_save.store(true, std::sync::atomic::Ordering::SeqCst);
    controller.set_choice("b").expect("b");

    let err = controller.save_and_next().await.expect_err("save fails");
    assert!(matches!(err, AttemptError::Save { ref question_id, .. } if question_id == "q1"));
    assert_eq!(controller.current_index(), 0);
    assert_eq!(controller.save_status("q1"), Some(false));
    assert!(matches!(drain(&mut events).as_slice(), [SessionEvent::SaveFailed { .. }]));
    assert!(!controller.is_saving());
}

#[tokio::test]
async fn second_save_while_in_flight_is_ignored() {
    let (controller, _events, api) = loaded(3600).await;
    api.hold_saves();
    controller.set_choice("a").expect("a");

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.save_and_next().await }
    });
    api.save_started.notified().await;
    assert!(controller.is_saving());

    let second = controller.save_and_next().await.expect("second save");
    assert_eq!(second, SaveOutcome::InFlight);

    api.release_save();
    let first = first.await.expect("join").expect("first save");
    assert!(matches!(first, SaveOutcome::Saved { current_index: 1, confirmed: true, .. }));
    assert_eq!(api.saves().len(), 1);
    assert_eq!(controller.current_index(), 1);
}

#[tokio::test]
async fn edit_during_save_stays_dirty() {
    let (controller, _events, api) = loaded(3600).await;
    api.hold_saves();
    controller.set_choice("a").expect("a");

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.save_and_next().await }
    });
    api.save_started.notified().await;
    controller.set_choice("b").expect("b");
    api.release_save();

    let outcome = pending.await.expect("join").expect("save");
    assert!(matches!(outcome, SaveOutcome::Saved { confirmed: false, current_index: 1, .. }));
    assert_eq!(controller.save_status("q1"), Some(false));
    assert_eq!(controller.draft("q1"), choice(&["b"]));
}

#[tokio::test]
async fn navigation_after_save_started_is_kept() {
    let (controller, _events, api) = loaded(3600).await;
    api.hold_saves();

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.save_and_next().await }
    });
    api.save_started.notified().await;
    controller.go_to(2).expect("jump");
    api.release_save();

    pending.await.expect("join").expect("save");
    assert_eq!(controller.current_index(), 2);
}

#[tokio::test]
async fn previous_and_go_to_bounds() {
    let (controller, _events, _api) = loaded(1800).await;

    assert_eq!(controller.previous().expect("previous"), 0);
    controller.go_to(2).expect("go to last");
    assert_eq!(controller.previous().expect("previous"), 1);
    assert!(matches!(controller.go_to(3), Err(AttemptError::InvalidIndex { index: 3, len: 3 })));
    assert_eq!(controller.current_index(), 1);
}

#[tokio::test]
async fn explicit_submit_is_idempotent() {
    let (controller, mut events, api) = loaded(1800).await;

    let outcome = controller.submit(&AutoConfirm).await.expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Submitted { mode: FinalizeMode::ManualSubmit, finalized: true }
    );
    assert_eq!(controller.phase(), SessionPhase::Submitted(FinalizeMode::ManualSubmit));

    let again = controller.submit(&AutoConfirm).await.expect("second submit");
    assert_eq!(again, SubmitOutcome::AlreadySubmitted);
    assert_eq!(controller.auto_submit().await, SubmitOutcome::AlreadySubmitted);
    assert_eq!(api.submit_count(), 1);

    let drained = drain(&mut events);
    assert_eq!(
        navigations(&drained),
        vec![&Route::SubmissionComplete {
            exam_id: "exam-1".to_string(),
            mode: FinalizeMode::ManualSubmit,
        }]
    );
    assert!(matches!(controller.set_choice("a"), Err(AttemptError::NotActive)));
}

#[tokio::test]
async fn declined_confirmation_keeps_attempt_open() {
    let (controller, _events, api) = loaded(1800).await;
    controller.set_choice("a").expect("a");
    let decline = Decline { prompts: Mutex::new(Vec::new()) };

    let outcome = controller.submit(&decline).await.expect("submit");
    assert_eq!(outcome, SubmitOutcome::Cancelled);
    assert_eq!(controller.phase(), SessionPhase::Active);
    assert_eq!(api.submit_count(), 0);

    let prompts = decline.prompts.lock().expect("prompts");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("2/3 unanswered, 1 with unsaved changes"));
}

#[tokio::test]
async fn scripted_runs_can_skip_confirmation() {
    let api = FakeAttemptApi::new(sample_snapshot(1800));
    let settings = AttemptSettings { confirm_submit: false, ..AttemptSettings::default() };
    let (controller, _events, api) = harness_with(api, settings);
    controller.load().await.expect("load");
    let decline = Decline { prompts: Mutex::new(Vec::new()) };

    let outcome = controller.submit(&decline).await.expect("submit");
    assert!(matches!(outcome, SubmitOutcome::Submitted { finalized: true, .. }));
    assert!(decline.prompts.lock().expect("prompts").is_empty());
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test]
async fn failed_submit_can_be_retried() {
    let (controller, mut events, api) = loaded(1800).await;
    drain(&mut events);
    api.fail_submit.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = controller.submit(&AutoConfirm).await.expect_err("submit fails");
    assert!(matches!(err, AttemptError::Submit(_)));
    assert_eq!(controller.phase(), SessionPhase::Active);
    assert!(matches!(drain(&mut events).as_slice(), [SessionEvent::SubmitFailed { .. }]));

    api.fail_submit.store(false, std::sync::atomic::Ordering::SeqCst);
    let outcome = controller.submit(&AutoConfirm).await.expect("retry");
    assert!(matches!(outcome, SubmitOutcome::Submitted { finalized: true, .. }));
    assert_eq!(api.submit_count(), 2);
}

#[tokio::test]
async fn submit_while_finalizing_reports_in_progress() {
    let (controller, mut events, api) = loaded(1800).await;
    api.hold_submits();

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(&AutoConfirm).await }
    });
    api.submit_started.notified().await;
    assert_eq!(controller.phase(), SessionPhase::Submitting(FinalizeMode::ManualSubmit));

    let second = controller.submit(&AutoConfirm).await.expect("second submit");
    assert_eq!(second, SubmitOutcome::AlreadySubmitting);
    assert_eq!(controller.auto_submit().await, SubmitOutcome::AlreadySubmitting);
    assert_eq!(api.submit_count(), 1);

    api.release_submits(1);
    let first = first.await.expect("join").expect("first submit");
    assert_eq!(
        first,
        SubmitOutcome::Submitted { mode: FinalizeMode::ManualSubmit, finalized: true }
    );
    assert_eq!(api.submit_count(), 1);
    assert_eq!(navigations(&drain(&mut events)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_during_failed_submit_closes_attempt() {
    let (controller, mut events, api) = loaded(2).await;
    api.hold_submits();
    api.fail_submit.store(true, std::sync::atomic::Ordering::SeqCst);

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(&AutoConfirm).await }
    });
    api.submit_started.notified().await;

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(controller.remaining_seconds(), 0);
    assert_eq!(controller.phase(), SessionPhase::Submitting(FinalizeMode::ManualSubmit));
    assert_eq!(api.submit_count(), 1);

    api.release_submits(2);
    let err = first.await.expect("join").expect_err("manual submit fails");
    assert!(matches!(err, AttemptError::Submit(_)));
    assert_eq!(controller.phase(), SessionPhase::Submitted(FinalizeMode::AutoDeadline));
    assert_eq!(api.submit_count(), 2);

    let drained = drain(&mut events);
    assert_eq!(
        navigations(&drained),
        vec![&Route::SubmissionComplete {
            exam_id: "exam-1".to_string(),
            mode: FinalizeMode::AutoDeadline,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn countdown_follows_wall_clock_seconds() {
    let (controller, _events, api) = loaded(5).await;

    tokio::time::sleep(Duration::from_millis(1_400)).await;
    assert_eq!(controller.remaining_seconds(), 4);
    assert_eq!(controller.phase(), SessionPhase::Active);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(controller.remaining_seconds(), 2);
    assert_eq!(api.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn countdown_auto_submits_exactly_once() {
    let (controller, mut events, api) = loaded(5).await;

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(controller.remaining_seconds(), 1);
    assert_eq!(controller.phase(), SessionPhase::Active);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.remaining_seconds(), 0);
    assert_eq!(controller.phase(), SessionPhase::Submitted(FinalizeMode::AutoDeadline));
    assert_eq!(api.submit_count(), 1);

    let drained = drain(&mut events);
    let ticks: Vec<u64> = drained
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Tick { remaining_seconds } => Some(*remaining_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![4, 3, 2, 1, 0]);
    assert_eq!(
        navigations(&drained),
        vec![&Route::SubmissionComplete {
            exam_id: "exam-1".to_string(),
            mode: FinalizeMode::AutoDeadline,
        }]
    );

    assert_eq!(controller.auto_submit().await, SubmitOutcome::AlreadySubmitted);
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_submit_leaves_even_when_backend_fails() {
    let (controller, mut events, api) = loaded(2).await;
    api.fail_submit.store(true, std::sync::atomic::Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.phase(), SessionPhase::Submitted(FinalizeMode::AutoDeadline));
    assert_eq!(api.submit_count(), 1);
    assert_eq!(navigations(&drain(&mut events)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_attempt_submits_on_load() {
    let (controller, _events, api) = loaded(-30).await;
    assert_eq!(controller.remaining_seconds(), 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.phase(), SessionPhase::Submitted(FinalizeMode::AutoDeadline));
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_submit_stops_countdown() {
    let (controller, mut events, api) = loaded(60).await;
    controller.submit(&AutoConfirm).await.expect("submit");
    drain(&mut events);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(controller.remaining_seconds(), 60);
    assert!(drain(&mut events).is_empty());
    assert_eq!(api.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn close_stops_countdown_and_rejects_work() {
    let (controller, mut events, api) = loaded(5).await;
    controller.close();
    drain(&mut events);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(controller.remaining_seconds(), 5);
    assert!(drain(&mut events).is_empty());
    assert_eq!(api.submit_count(), 0);
    assert!(matches!(controller.set_choice("a"), Err(AttemptError::Closed)));
    assert_eq!(controller.auto_submit().await, SubmitOutcome::NotActive);
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_ends_countdown() {
    let (controller, _events, api) = loaded(3).await;
    drop(controller);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.submit_count(), 0);
}

#[tokio::test]
async fn view_reflects_current_question() {
    let (controller, _events, _api) = loaded(1800).await;
    controller.go_to(1).expect("go to q2");
    controller.set_choice("b").expect("b");

    let view = controller.view();
    assert_eq!(view.title, "Mechanics Quiz");
    assert_eq!(view.current_index, 1);
    assert_eq!(view.question_count, 3);
    assert_eq!(view.question.map(|question| question.id), Some("q2".to_string()));
    assert_eq!(view.draft, choice(&["b"]));
    assert_eq!(view.status, QuestionStatus::Unsaved);
    assert_eq!(view.phase, SessionPhase::Active);
}
