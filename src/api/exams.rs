use reqwest::Method;
use validator::Validate;

use crate::api::{ClientError, HttpExamApi};
use crate::schemas::exam::{
    ExamForm, ExamResult, ExamSummary, LeaderboardEntry, QuestionForm, QuestionRecord,
};

impl HttpExamApi {
    pub async fn list_available_exams(&self) -> Result<Vec<ExamSummary>, ClientError> {
        self.require_context()?;
        let request = self.request(Method::GET, &["student", "exams"]);
        self.send_json("list_available_exams", request).await
    }

    pub async fn fetch_result(&self, exam_id: &str) -> Result<ExamResult, ClientError> {
        self.require_context()?;
        let request = self.request(Method::GET, &["student", "exams", exam_id, "result"]);
        self.send_json("fetch_result", request).await
    }

    pub async fn leaderboard(&self, exam_id: &str) -> Result<Vec<LeaderboardEntry>, ClientError> {
        self.require_context()?;
        let request = self.request(Method::GET, &["exams", exam_id, "leaderboard"]);
        self.send_json("leaderboard", request).await
    }

    pub async fn list_exams(&self) -> Result<Vec<ExamSummary>, ClientError> {
        self.require_admin()?;
        let request = self.request(Method::GET, &["admin", "exams"]);
        self.send_json("list_exams", request).await
    }

    pub async fn create_exam(&self, form: &ExamForm) -> Result<ExamSummary, ClientError> {
        self.require_admin()?;
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self.request(Method::POST, &["admin", "exams"]).json(form);
        self.send_json("create_exam", request).await
    }

    pub async fn update_exam(
        &self,
        exam_id: &str,
        form: &ExamForm,
    ) -> Result<ExamSummary, ClientError> {
        self.require_admin()?;
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self.request(Method::PUT, &["admin", "exams", exam_id]).json(form);
        self.send_json("update_exam", request).await
    }

    pub async fn delete_exam(&self, exam_id: &str) -> Result<(), ClientError> {
        self.require_admin()?;
        let request = self.request(Method::DELETE, &["admin", "exams", exam_id]);
        self.send_empty("delete_exam", request).await
    }

    pub async fn list_questions(&self, exam_id: &str) -> Result<Vec<QuestionRecord>, ClientError> {
        self.require_admin()?;
        let request = self.request(Method::GET, &["admin", "exams", exam_id, "questions"]);
        self.send_json("list_questions", request).await
    }

    pub async fn create_question(
        &self,
        exam_id: &str,
        form: &QuestionForm,
    ) -> Result<QuestionRecord, ClientError> {
        self.require_admin()?;
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request =
            self.request(Method::POST, &["admin", "exams", exam_id, "questions"]).json(form);
        self.send_json("create_question", request).await
    }

    pub async fn update_question(
        &self,
        exam_id: &str,
        question_id: &str,
        form: &QuestionForm,
    ) -> Result<QuestionRecord, ClientError> {
        self.require_admin()?;
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self
            .request(Method::PUT, &["admin", "exams", exam_id, "questions", question_id])
            .json(form);
        self.send_json("update_question", request).await
    }

    pub async fn delete_question(
        &self,
        exam_id: &str,
        question_id: &str,
    ) -> Result<(), ClientError> {
        self.require_admin()?;
        let request =
            self.request(Method::DELETE, &["admin", "exams", exam_id, "questions", question_id]);
        self.send_empty("delete_question", request).await
    }
}
