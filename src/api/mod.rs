mod attempt;
mod auth;
pub mod errors;
mod exams;
mod http;
mod users;

use async_trait::async_trait;

pub use errors::ClientError;
pub use http::HttpExamApi;

use crate::schemas::attempt::{AnswerPayload, AttemptSnapshot};

/// Backend operations the attempt controller depends on.
#[async_trait]
pub trait AttemptApi: Send + Sync {
    async fn fetch_attempt(&self, exam_id: &str) -> Result<AttemptSnapshot, ClientError>;

    async fn save_answer(
        &self,
        exam_id: &str,
        question_id: &str,
        payload: &AnswerPayload,
    ) -> Result<(), ClientError>;

    async fn submit_attempt(&self, exam_id: &str) -> Result<(), ClientError>;
}
