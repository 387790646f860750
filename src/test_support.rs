use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, Notify, OwnedMutexGuard, Semaphore};

use crate::api::{AttemptApi, ClientError};
use crate::core::context::{Identity, Role, SessionContext};
use crate::schemas::attempt::{
    AnswerPayload, AttemptSnapshot, OptionDto, QuestionDto, QuestionType, StudentAnswerDto,
};

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn student_context() -> SessionContext {
    context("student-1", Role::Student)
}

pub(crate) fn admin_context() -> SessionContext {
    context("admin-1", Role::Admin)
}

fn context(subject: &str, role: Role) -> SessionContext {
    let identity =
        Identity { subject: subject.to_string(), role, display_name: None, expires_at: None };
    SessionContext::new(format!("{subject}-token"), identity)
}

fn option_dtos(ids: &[&str]) -> Vec<OptionDto> {
    ids.iter()
        .map(|id| OptionDto { id: id.to_string(), text: format!("Option {}", id.to_uppercase()) })
        .collect()
}

pub(crate) fn question(id: &str, question_type: QuestionType) -> QuestionDto {
    let options =
        if question_type.is_choice() { option_dtos(&["a", "b", "c"]) } else { Vec::new() };
    QuestionDto {
        id: id.to_string(),
        statement: format!("Question {id}"),
        question_type,
        options,
        student_answer: None,
    }
}

/// Three questions: single-correct `q1`, multiple-correct `q2`, numerical `q3`.
pub(crate) fn sample_snapshot(remaining_seconds: i64) -> AttemptSnapshot {
    AttemptSnapshot {
        exam_id: Some("exam-1".to_string()),
        exam_title: "Mechanics Quiz".to_string(),
        remaining_seconds,
        questions: vec![
            question("q1", QuestionType::SingleCorrect),
            question("q2", QuestionType::MultipleCorrect),
            question("q3", QuestionType::Numerical),
        ],
    }
}

pub(crate) fn with_prior_choice(mut dto: QuestionDto, ids: &[&str]) -> QuestionDto {
    dto.student_answer = Some(StudentAnswerDto {
        selected_option_ids: ids.iter().map(|id| id.to_string()).collect(),
        numerical_answer: None,
    });
    dto
}

fn backend_error() -> ClientError {
    ClientError::Status { status: 500, detail: "backend unavailable".to_string() }
}

/// In-memory attempt backend with switchable failures and optional gates
/// that park saves or submits until the test releases them.
pub(crate) struct FakeAttemptApi {
    snapshot: AttemptSnapshot,
    pub(crate) fail_fetch: AtomicBool,
    pub(crate) fail_save: AtomicBool,
    pub(crate) fail_submit: AtomicBool,
    fetches: AtomicUsize,
    submits: AtomicUsize,
    saves: Mutex<Vec<(String, AnswerPayload)>>,
    gate_saves: AtomicBool,
    save_gate: Semaphore,
    pub(crate) save_started: Notify,
    gate_submits: AtomicBool,
    submit_gate: Semaphore,
    pub(crate) submit_started: Notify,
}

impl FakeAttemptApi {
    pub(crate) fn new(snapshot: AttemptSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            fail_fetch: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
            gate_saves: AtomicBool::new(false),
            save_gate: Semaphore::new(0),
            save_started: Notify::new(),
            gate_submits: AtomicBool::new(false),
            submit_gate: Semaphore::new(0),
            submit_started: Notify::new(),
        })
    }

    pub(crate) fn hold_saves(&self) {
        self.gate_saves.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release_save(&self) {
        self.save_gate.add_permits(1);
    }

    pub(crate) fn hold_submits(&self) {
        self.gate_submits.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release_submits(&self, count: usize) {
        self.submit_gate.add_permits(count);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub(crate) fn saves(&self) -> Vec<(String, AnswerPayload)> {
        self.saves.lock().expect("saves lock").clone()
    }
}

#[async_trait]
impl AttemptApi for FakeAttemptApi {
    async fn fetch_attempt(&self, _exam_id: &str) -> Result<AttemptSnapshot, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(backend_error());
        }
        Ok(self.snapshot.clone())
    }

    async fn save_answer(
        &self,
        _exam_id: &str,
        question_id: &str,
        payload: &AnswerPayload,
    ) -> Result<(), ClientError> {
        self.save_started.notify_one();
        if self.gate_saves.load(Ordering::SeqCst) {
            self.save_gate.acquire().await.expect("save gate").forget();
        }
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(backend_error());
        }
        self.saves.lock().expect("saves lock").push((question_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn submit_attempt(&self, _exam_id: &str) -> Result<(), ClientError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submit_started.notify_one();
        if self.gate_submits.load(Ordering::SeqCst) {
            self.submit_gate.acquire().await.expect("submit gate").forget();
        }
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(backend_error());
        }
        Ok(())
    }
}
