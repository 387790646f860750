use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::schemas::attempt::QuestionType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub attempted: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExamForm {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "duration must be 1-1440 minutes"))]
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OptionForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub text: String,
    #[serde(default, rename = "isCorrect")]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_question_shape"))]
pub struct QuestionForm {
    #[validate(length(min = 1, message = "statement must not be empty"))]
    pub statement: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<OptionForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_numerical_answer: Option<f64>,
    #[validate(range(min = 0.0, message = "marks must be non-negative"))]
    pub marks: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "questionText")]
    pub statement: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<OptionForm>,
    #[serde(default)]
    pub correct_numerical_answer: Option<f64>,
    #[serde(default)]
    pub marks: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub exam_id: String,
    #[serde(default)]
    pub exam_title: Option<String>,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    #[serde(alias = "username")]
    pub name: String,
    pub score: f64,
}

fn validate_question_shape(form: &QuestionForm) -> Result<(), ValidationError> {
    match form.question_type {
        QuestionType::Numerical => {
            if !form.options.is_empty() {
                return Err(shape_error("numerical questions must not have options"));
            }
            if form.correct_numerical_answer.is_none() {
                return Err(shape_error("numerical questions need a correct answer"));
            }
        }
        QuestionType::SingleCorrect | QuestionType::MultipleCorrect => {
            if form.options.len() < 2 {
                return Err(shape_error("choice questions need at least two options"));
            }
            let correct = form.options.iter().filter(|option| option.is_correct).count();
            if correct == 0 {
                return Err(shape_error("choice questions need a correct option"));
            }
            if form.question_type == QuestionType::SingleCorrect && correct > 1 {
                return Err(shape_error("single-correct questions allow one correct option"));
            }
        }
    }
    Ok(())
}

fn shape_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("question_shape");
    error.message = Some(Cow::Borrowed(message));
    error
}
