use async_trait::async_trait;
use reqwest::Method;

use crate::api::{AttemptApi, ClientError, HttpExamApi};
use crate::schemas::attempt::{AnswerPayload, AttemptSnapshot};

#[async_trait]
impl AttemptApi for HttpExamApi {
    async fn fetch_attempt(&self, exam_id: &str) -> Result<AttemptSnapshot, ClientError> {
        self.require_context()?;
        let request = self.request(Method::GET, &["student", "exams", exam_id, "attempt"]);
        self.send_json("fetch_attempt", request).await
    }

    async fn save_answer(
        &self,
        exam_id: &str,
        question_id: &str,
        payload: &AnswerPayload,
    ) -> Result<(), ClientError> {
        self.require_context()?;
        let segments = ["student", "exams", exam_id, "questions", question_id, "answer"];
        let request = self.request(Method::POST, &segments).json(payload);
        self.send_empty("save_answer", request).await
    }

    async fn submit_attempt(&self, exam_id: &str) -> Result<(), ClientError> {
        self.require_context()?;
        let request = self.request(Method::POST, &["student", "exams", exam_id, "submit"]);
        self.send_empty("submit_attempt", request).await
    }
}
