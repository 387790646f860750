//! Timed exam attempt: loads the candidate's attempt once, keeps per-question
//! drafts and their saved/dirty state, runs the countdown, and submits exactly
//! once, either on request or when time runs out.

mod controller;
mod countdown;
mod errors;
mod finalize;
mod model;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use controller::{
    AttemptController, LoadOutcome, QuestionStatus, SaveOutcome, SessionPhase, SessionView,
};
pub use errors::AttemptError;
pub use finalize::{FinalizeMode, SubmitOutcome};
pub use model::{AnswerDraft, AttemptSession, ChoiceOption, Question, QuestionId, QuestionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SubmissionComplete { exam_id: String, mode: FinalizeMode },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loaded { title: String, question_count: usize, remaining_seconds: u64 },
    LoadFailed { message: String },
    Tick { remaining_seconds: u64 },
    AnswerSaved { question_id: QuestionId },
    SaveFailed { question_id: QuestionId, message: String },
    SubmitFailed { message: String },
    Navigate(Route),
}

/// Yes/no gate shown before an explicit submission.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Accepts every prompt.
pub struct AutoConfirm;

#[async_trait]
impl Confirmation for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
