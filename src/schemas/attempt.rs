use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    SingleCorrect,
    MultipleCorrect,
    Numerical,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::SingleCorrect => "SINGLE_CORRECT",
            QuestionType::MultipleCorrect => "MULTIPLE_CORRECT",
            QuestionType::Numerical => "NUMERICAL",
        }
    }

    pub fn is_choice(self) -> bool {
        !matches!(self, QuestionType::Numerical)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    #[serde(default)]
    pub exam_id: Option<String>,
    #[serde(alias = "title")]
    pub exam_title: String,
    pub remaining_seconds: i64,
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: String,
    #[serde(alias = "questionText", alias = "text")]
    pub statement: String,
    #[serde(rename = "type", alias = "questionType")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<OptionDto>,
    #[serde(default)]
    pub student_answer: Option<StudentAnswerDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDto {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswerDto {
    #[serde(default)]
    pub selected_option_ids: Vec<String>,
    #[serde(default)]
    pub numerical_answer: Option<f64>,
}

/// Body of a single-answer save. Choice questions always send an array, which
/// is empty when nothing is selected; numerical questions send `null` when blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    Choice {
        #[serde(rename = "selectedOptionIds")]
        selected_option_ids: Vec<String>,
    },
    Numerical {
        #[serde(rename = "numericalAnswer")]
        numerical_answer: Option<f64>,
    },
}
