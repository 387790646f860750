use thiserror::Error;

use crate::api::ClientError;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("attempt is not active")]
    NotActive,
    #[error("attempt controller was closed")]
    Closed,
    #[error("only candidates can take an exam")]
    NotCandidate,
    #[error("attempt has no questions")]
    NoQuestions,
    #[error("question index {index} is out of range (0..{len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("{operation} does not apply to a {kind} question")]
    KindMismatch { operation: &'static str, kind: &'static str },
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("not a number: {0}")]
    InvalidNumber(String),
    #[error("failed to load attempt: {0}")]
    Load(#[source] ClientError),
    #[error("failed to save answer for question {question_id}: {source}")]
    Save {
        question_id: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to submit attempt: {0}")]
    Submit(#[source] ClientError),
}
