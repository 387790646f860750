use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::api::AttemptApi;
use crate::attempt::countdown::{Countdown, TickOutcome};
use crate::attempt::errors::AttemptError;
use crate::attempt::finalize::{FinalizeMode, SubmitOutcome};
use crate::attempt::model::{AnswerDraft, AttemptSession, LoadedAttempt, Question, QuestionKind};
use crate::attempt::{Confirmation, Route, SessionEvent};
use crate::core::config::AttemptSettings;
use crate::core::context::{Role, SessionContext};
use crate::core::{metrics, time as clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Active,
    Submitting(FinalizeMode),
    Submitted(FinalizeMode),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    NotAnswered,
    Unsaved,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { question_count: usize, remaining_seconds: u64 },
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// `confirmed` is false when the draft changed while the request was in
    /// flight; the question then stays dirty.
    Saved { question_id: String, current_index: usize, confirmed: bool },
    InFlight,
}

/// Everything a front end needs to draw the current question.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub title: String,
    pub current_index: usize,
    pub question_count: usize,
    pub question: Option<Question>,
    pub draft: Option<AnswerDraft>,
    pub status: QuestionStatus,
    pub remaining_seconds: u64,
    pub last_saved_at: Option<OffsetDateTime>,
}

struct SessionState {
    phase: SessionPhase,
    closed: bool,
    session: Option<Arc<AttemptSession>>,
    current: usize,
    drafts: HashMap<String, AnswerDraft>,
    saved: HashMap<String, bool>,
    revisions: HashMap<String, u64>,
    remaining_seconds: u64,
    last_saved_at: Option<OffsetDateTime>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Loading,
            closed: false,
            session: None,
            current: 0,
            drafts: HashMap::new(),
            saved: HashMap::new(),
            revisions: HashMap::new(),
            remaining_seconds: 0,
            last_saved_at: None,
        }
    }

    fn ensure_open(&self) -> Result<(), AttemptError> {
        if self.closed {
            return Err(AttemptError::Closed);
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), AttemptError> {
        self.ensure_open()?;
        if self.phase != SessionPhase::Active {
            return Err(AttemptError::NotActive);
        }
        Ok(())
    }

    fn loaded_session(&self) -> Result<Arc<AttemptSession>, AttemptError> {
        self.session.clone().ok_or(AttemptError::NotActive)
    }

    fn current_question(&self) -> Result<(Arc<AttemptSession>, usize), AttemptError> {
        let session = self.loaded_session()?;
        if session.questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }
        Ok((session, self.current))
    }

    fn revision(&self, question_id: &str) -> u64 {
        self.revisions.get(question_id).copied().unwrap_or(0)
    }

    fn mark_dirty(&mut self, question_id: &str) {
        self.saved.insert(question_id.to_string(), false);
        *self.revisions.entry(question_id.to_string()).or_insert(0) += 1;
    }

    fn status_of(&self, question_id: &str) -> QuestionStatus {
        if self.saved.get(question_id).copied().unwrap_or(false) {
            QuestionStatus::Saved
        } else if self.drafts.contains_key(question_id) {
            QuestionStatus::Unsaved
        } else {
            QuestionStatus::NotAnswered
        }
    }
}

/// Drives one candidate's timed attempt. Shared behind an `Arc`; every
/// operation takes `&self` so a front end can fire them from any task.
pub struct AttemptController {
    api: Arc<dyn AttemptApi>,
    context: SessionContext,
    exam_id: String,
    settings: AttemptSettings,
    state: Mutex<SessionState>,
    load_started: AtomicBool,
    saving: AtomicBool,
    countdown: Mutex<Option<Countdown>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl AttemptController {
    pub fn new(
        api: Arc<dyn AttemptApi>,
        context: SessionContext,
        exam_id: impl Into<String>,
        settings: AttemptSettings,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            api,
            context,
            exam_id: exam_id.into(),
            settings,
            state: Mutex::new(SessionState::new()),
            load_started: AtomicBool::new(false),
            saving: AtomicBool::new(false),
            countdown: Mutex::new(None),
            events,
        });
        (controller, receiver)
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    /// Fetches the attempt snapshot. Runs at most once per controller; later
    /// calls return `AlreadyStarted` without touching the backend.
    pub async fn load(self: &Arc<Self>) -> Result<LoadOutcome, AttemptError> {
        if self.load_started.swap(true, Ordering::SeqCst) {
            return Ok(LoadOutcome::AlreadyStarted);
        }

        if self.context.identity().role != Role::Student {
            self.lock_state().phase = SessionPhase::Failed;
            self.emit(SessionEvent::LoadFailed { message: AttemptError::NotCandidate.to_string() });
            return Err(AttemptError::NotCandidate);
        }

        let snapshot = match self.api.fetch_attempt(&self.exam_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(exam_id = %self.exam_id, error = %err, "Failed to load attempt");
                self.lock_state().phase = SessionPhase::Failed;
                self.emit(SessionEvent::LoadFailed { message: err.to_string() });
                return Err(AttemptError::Load(err));
            }
        };

        let loaded = LoadedAttempt::from_snapshot(&self.exam_id, snapshot);
        let question_count = loaded.session.questions.len();
        let remaining_seconds = loaded.remaining_seconds;
        let title = loaded.session.title.clone();

        {
            let mut state = self.lock_state();
            state.ensure_open()?;
            for (question_id, draft) in loaded.seeded {
                state.saved.insert(question_id.clone(), true);
                state.drafts.insert(question_id, draft);
            }
            state.session = Some(Arc::new(loaded.session));
            state.current = 0;
            state.remaining_seconds = remaining_seconds;
            state.phase = SessionPhase::Active;
        }

        tracing::info!(
            exam_id = %self.exam_id,
            candidate = %self.context.identity().subject,
            question_count,
            remaining_seconds,
            "Attempt loaded"
        );
        self.emit(SessionEvent::Loaded { title, question_count, remaining_seconds });
        self.start_countdown();

        Ok(LoadOutcome::Loaded { question_count, remaining_seconds })
    }

    /// Selects `option_id` on the current question: replaces the selection
    /// for single-correct questions, toggles it for multiple-correct ones.
    pub fn set_choice(&self, option_id: &str) -> Result<(), AttemptError> {
        let mut state = self.lock_state();
        state.ensure_active()?;
        let (session, index) = state.current_question()?;
        let question = &session.questions[index];

        let options = match &question.kind {
            QuestionKind::SingleCorrect { options } | QuestionKind::MultipleCorrect { options } => {
                options
            }
            QuestionKind::Numerical => {
                return Err(AttemptError::KindMismatch {
                    operation: "set_choice",
                    kind: question.kind.question_type().as_str(),
                })
            }
        };
        if !options.iter().any(|option| option.id == option_id) {
            return Err(AttemptError::UnknownOption(option_id.to_string()));
        }

        let mut selected = match state.drafts.get(&question.id) {
            Some(AnswerDraft::Choice(selected)) => selected.clone(),
            _ => BTreeSet::new(),
        };
        if matches!(question.kind, QuestionKind::SingleCorrect { .. }) {
            selected.clear();
            selected.insert(option_id.to_string());
        } else if !selected.remove(option_id) {
            selected.insert(option_id.to_string());
        }

        state.drafts.insert(question.id.clone(), AnswerDraft::Choice(selected));
        state.mark_dirty(&question.id);
        Ok(())
    }

    pub fn set_numerical(&self, value: impl Into<String>) -> Result<(), AttemptError> {
        let mut state = self.lock_state();
        state.ensure_active()?;
        let (session, index) = state.current_question()?;
        let question = &session.questions[index];

        if !matches!(question.kind, QuestionKind::Numerical) {
            return Err(AttemptError::KindMismatch {
                operation: "set_numerical",
                kind: question.kind.question_type().as_str(),
            });
        }

        state.drafts.insert(question.id.clone(), AnswerDraft::Numerical(value.into()));
        state.mark_dirty(&question.id);
        Ok(())
    }

    /// Forgets the current question's answer entirely, as if never touched.
    pub fn clear(&self) -> Result<(), AttemptError> {
        let mut state = self.lock_state();
        state.ensure_active()?;
        let (session, index) = state.current_question()?;
        let question_id = &session.questions[index].id;

        state.drafts.remove(question_id);
        state.saved.remove(question_id);
        *state.revisions.entry(question_id.clone()).or_insert(0) += 1;
        Ok(())
    }

    pub fn previous(&self) -> Result<usize, AttemptError> {
        let mut state = self.lock_state();
        state.ensure_open()?;
        state.current_question()?;
        state.current = state.current.saturating_sub(1);
        Ok(state.current)
    }

    /// Jumps to any question; never blocked by unsaved answers.
    pub fn go_to(&self, index: usize) -> Result<(), AttemptError> {
        let mut state = self.lock_state();
        state.ensure_open()?;
        let (session, _) = state.current_question()?;
        let len = session.questions.len();
        if index >= len {
            return Err(AttemptError::InvalidIndex { index, len });
        }
        state.current = index;
        Ok(())
    }

    /// Persists the current question's draft and moves to the next question.
    /// While one save is in flight further calls return `InFlight`.
    pub async fn save_and_next(&self) -> Result<SaveOutcome, AttemptError> {
        let Some(_busy) = BusyGuard::acquire(&self.saving) else {
            tracing::debug!(exam_id = %self.exam_id, "Save already in flight");
            return Ok(SaveOutcome::InFlight);
        };

        let (index, question_id, payload, revision) = {
            let state = self.lock_state();
            state.ensure_active()?;
            let (session, index) = state.current_question()?;
            let question = &session.questions[index];
            let payload = question.payload(state.drafts.get(&question.id))?;
            (index, question.id.clone(), payload, state.revision(&question.id))
        };

        let result = self.api.save_answer(&self.exam_id, &question_id, &payload).await;

        if let Err(err) = result {
            metrics::record_save(false);
            tracing::warn!(
                exam_id = %self.exam_id,
                question_id = %question_id,
                error = %err,
                "Failed to save answer"
            );
            self.emit(SessionEvent::SaveFailed {
                question_id: question_id.clone(),
                message: err.to_string(),
            });
            return Err(AttemptError::Save { question_id, source: err });
        }

        metrics::record_save(true);
        let (current_index, confirmed) = {
            let mut state = self.lock_state();
            state.ensure_open()?;
            let confirmed = state.revision(&question_id) == revision;
            if confirmed {
                state.saved.insert(question_id.clone(), true);
                state.last_saved_at = Some(clock::now_utc());
            }
            let last = state
                .session
                .as_ref()
                .map_or(0, |session| session.questions.len().saturating_sub(1));
            if state.current == index {
                state.current = (index + 1).min(last);
            }
            (state.current, confirmed)
        };

        tracing::debug!(
            exam_id = %self.exam_id,
            question_id = %question_id,
            confirmed,
            "Answer saved"
        );
        self.emit(SessionEvent::AnswerSaved { question_id: question_id.clone() });

        Ok(SaveOutcome::Saved { question_id, current_index, confirmed })
    }

    /// Explicit submission behind a confirmation gate. A failure leaves the
    /// attempt active so the candidate can retry.
    pub async fn submit(
        &self,
        confirmation: &dyn Confirmation,
    ) -> Result<SubmitOutcome, AttemptError> {
        if let Some(outcome) = self.submission_precheck()? {
            return Ok(outcome);
        }

        // Skipping the prompt is reserved for unattended, scripted runs.
        if self.settings.confirm_submit {
            let prompt = self.confirmation_prompt();
            if !confirmation.confirm(&prompt).await {
                return Ok(SubmitOutcome::Cancelled);
            }
        }

        let mode = FinalizeMode::ManualSubmit;
        if let Some(outcome) = self.begin_submission(mode) {
            return Ok(outcome);
        }

        match self.api.submit_attempt(&self.exam_id).await {
            Ok(()) => {
                metrics::record_submission(mode.as_str(), true);
                self.finish_submission(mode);
                Ok(SubmitOutcome::Submitted { mode, finalized: true })
            }
            Err(err) => {
                metrics::record_submission(mode.as_str(), false);
                tracing::error!(exam_id = %self.exam_id, error = %err, "Failed to submit attempt");
                let expired = {
                    let mut state = self.lock_state();
                    state.phase = SessionPhase::Active;
                    state.remaining_seconds == 0
                };
                self.emit(SessionEvent::SubmitFailed { message: err.to_string() });
                if expired {
                    self.auto_submit().await;
                }
                Err(AttemptError::Submit(err))
            }
        }
    }

    /// Deadline submission: no confirmation, and the attempt closes whether or
    /// not the backend accepted the finalize call.
    pub async fn auto_submit(&self) -> SubmitOutcome {
        let mode = FinalizeMode::AutoDeadline;
        if self.lock_state().closed {
            return SubmitOutcome::NotActive;
        }
        if let Some(outcome) = self.begin_submission(mode) {
            return outcome;
        }

        tracing::info!(exam_id = %self.exam_id, "Time is up, submitting attempt");
        let finalized = match self.api.submit_attempt(&self.exam_id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    exam_id = %self.exam_id,
                    error = %err,
                    "Deadline submission failed, leaving anyway"
                );
                false
            }
        };
        metrics::record_submission(mode.as_str(), finalized);

        // The deadline is authoritative; the attempt closes even if finalize failed.
        self.finish_submission(mode);
        SubmitOutcome::Submitted { mode, finalized }
    }

    /// Stops the countdown and turns late responses into no-ops.
    pub fn close(&self) {
        self.lock_state().closed = true;
        self.countdown_slot().take();
        tracing::debug!(exam_id = %self.exam_id, "Attempt controller closed");
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.lock_state().remaining_seconds
    }

    pub fn current_index(&self) -> usize {
        self.lock_state().current
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    pub fn draft(&self, question_id: &str) -> Option<AnswerDraft> {
        self.lock_state().drafts.get(question_id).cloned()
    }

    /// `None` when the question has no save status at all (never touched or cleared).
    pub fn save_status(&self, question_id: &str) -> Option<bool> {
        self.lock_state().saved.get(question_id).copied()
    }

    pub fn question_grid(&self) -> Vec<QuestionStatus> {
        let state = self.lock_state();
        match &state.session {
            Some(session) => {
                session.questions.iter().map(|question| state.status_of(&question.id)).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn view(&self) -> SessionView {
        let state = self.lock_state();
        let question = state
            .session
            .as_ref()
            .and_then(|session| session.questions.get(state.current))
            .cloned();
        let (draft, status) = match &question {
            Some(question) => {
                (state.drafts.get(&question.id).cloned(), state.status_of(&question.id))
            }
            None => (None, QuestionStatus::NotAnswered),
        };

        SessionView {
            phase: state.phase,
            title: state.session.as_ref().map(|session| session.title.clone()).unwrap_or_default(),
            current_index: state.current,
            question_count: state.session.as_ref().map_or(0, |session| session.questions.len()),
            question,
            draft,
            status,
            remaining_seconds: state.remaining_seconds,
            last_saved_at: state.last_saved_at,
        }
    }

    pub(crate) fn tick(&self) -> TickOutcome {
        let remaining = {
            let mut state = self.lock_state();
            if state.closed
                || !matches!(state.phase, SessionPhase::Active | SessionPhase::Submitting(_))
            {
                return TickOutcome::Stopped;
            }
            state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
            state.remaining_seconds
        };

        tracing::trace!(exam_id = %self.exam_id, remaining_seconds = remaining, "Tick");
        self.emit(SessionEvent::Tick { remaining_seconds: remaining });
        if remaining == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    fn start_countdown(self: &Arc<Self>) {
        let countdown = Countdown::start(Arc::downgrade(self));
        // Replacing the slot drops, and so aborts, any previous countdown.
        *self.countdown_slot() = Some(countdown);
    }

    fn submission_precheck(&self) -> Result<Option<SubmitOutcome>, AttemptError> {
        let state = self.lock_state();
        state.ensure_open()?;
        match state.phase {
            SessionPhase::Active => Ok(None),
            SessionPhase::Submitting(_) => Ok(Some(SubmitOutcome::AlreadySubmitting)),
            SessionPhase::Submitted(_) => Ok(Some(SubmitOutcome::AlreadySubmitted)),
            SessionPhase::Loading | SessionPhase::Failed => Err(AttemptError::NotActive),
        }
    }

    /// Moves `Active` to `Submitting`. Returns the outcome to report instead
    /// when another submission already owns the attempt.
    fn begin_submission(&self, mode: FinalizeMode) -> Option<SubmitOutcome> {
        let mut state = self.lock_state();
        match state.phase {
            SessionPhase::Active => {
                state.phase = SessionPhase::Submitting(mode);
                None
            }
            SessionPhase::Submitting(_) => Some(SubmitOutcome::AlreadySubmitting),
            SessionPhase::Submitted(_) => Some(SubmitOutcome::AlreadySubmitted),
            SessionPhase::Loading | SessionPhase::Failed => Some(SubmitOutcome::NotActive),
        }
    }

    fn finish_submission(&self, mode: FinalizeMode) {
        self.lock_state().phase = SessionPhase::Submitted(mode);
        self.countdown_slot().take();
        tracing::info!(exam_id = %self.exam_id, mode = mode.as_str(), "Attempt submitted");
        self.emit(SessionEvent::Navigate(Route::SubmissionComplete {
            exam_id: self.exam_id.clone(),
            mode,
        }));
    }

    fn confirmation_prompt(&self) -> String {
        let grid = self.question_grid();
        let unsaved = grid.iter().filter(|status| **status == QuestionStatus::Unsaved).count();
        let unanswered =
            grid.iter().filter(|status| **status == QuestionStatus::NotAnswered).count();
        let total = grid.len();
        format!("Submit the exam? {unanswered}/{total} unanswered, {unsaved} with unsaved changes.")
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver is gone once the front end stops listening.
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn countdown_slot(&self) -> MutexGuard<'_, Option<Countdown>> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
