use std::collections::BTreeSet;

use crate::attempt::errors::AttemptError;
use crate::schemas::attempt::{AnswerPayload, AttemptSnapshot, QuestionDto, QuestionType};

pub type QuestionId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    SingleCorrect { options: Vec<ChoiceOption> },
    MultipleCorrect { options: Vec<ChoiceOption> },
    Numerical,
}

impl QuestionKind {
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            QuestionKind::SingleCorrect { options } | QuestionKind::MultipleCorrect { options } => {
                options
            }
            QuestionKind::Numerical => &[],
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::SingleCorrect { .. } => QuestionType::SingleCorrect,
            QuestionKind::MultipleCorrect { .. } => QuestionType::MultipleCorrect,
            QuestionKind::Numerical => QuestionType::Numerical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub statement: String,
    pub kind: QuestionKind,
}

/// Candidate's in-memory answer for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerDraft {
    Choice(BTreeSet<String>),
    /// Raw input; parsed only when the answer is saved.
    Numerical(String),
}

#[derive(Debug, Clone)]
pub struct AttemptSession {
    pub exam_id: String,
    pub title: String,
    pub total_duration_seconds: u64,
    pub questions: Vec<Question>,
}

/// A snapshot converted into the session plus the drafts seeded from answers
/// given in an earlier sitting.
#[derive(Debug)]
pub(crate) struct LoadedAttempt {
    pub(crate) session: AttemptSession,
    pub(crate) seeded: Vec<(QuestionId, AnswerDraft)>,
    pub(crate) remaining_seconds: u64,
}

impl LoadedAttempt {
    pub(crate) fn from_snapshot(exam_id: &str, snapshot: AttemptSnapshot) -> Self {
        let remaining_seconds = u64::try_from(snapshot.remaining_seconds).unwrap_or(0);
        let mut questions = Vec::with_capacity(snapshot.questions.len());
        let mut seeded = Vec::new();

        for dto in snapshot.questions {
            let (question, prior) = question_from_dto(dto);
            if let Some(draft) = prior {
                seeded.push((question.id.clone(), draft));
            }
            questions.push(question);
        }

        Self {
            session: AttemptSession {
                exam_id: snapshot.exam_id.unwrap_or_else(|| exam_id.to_string()),
                title: snapshot.exam_title,
                total_duration_seconds: remaining_seconds,
                questions,
            },
            seeded,
            remaining_seconds,
        }
    }
}

fn question_from_dto(dto: QuestionDto) -> (Question, Option<AnswerDraft>) {
    let options: Vec<ChoiceOption> = dto
        .options
        .into_iter()
        .map(|option| ChoiceOption { id: option.id, text: option.text })
        .collect();

    let kind = match dto.question_type {
        QuestionType::SingleCorrect => QuestionKind::SingleCorrect { options },
        QuestionType::MultipleCorrect => QuestionKind::MultipleCorrect { options },
        QuestionType::Numerical => QuestionKind::Numerical,
    };

    let prior = dto.student_answer.map(|answer| match &kind {
        QuestionKind::Numerical => AnswerDraft::Numerical(
            answer.numerical_answer.map(|value| value.to_string()).unwrap_or_default(),
        ),
        QuestionKind::SingleCorrect { options } | QuestionKind::MultipleCorrect { options } => {
            let mut selected: BTreeSet<String> = answer
                .selected_option_ids
                .into_iter()
                .filter(|id| options.iter().any(|option| &option.id == id))
                .collect();
            if matches!(kind, QuestionKind::SingleCorrect { .. }) && selected.len() > 1 {
                selected = selected.into_iter().take(1).collect();
            }
            AnswerDraft::Choice(selected)
        }
    });

    (Question { id: dto.id, statement: dto.statement, kind }, prior)
}

impl Question {
    /// Wire body for saving this question. A missing draft saves as "nothing
    /// selected", the same body an explicitly emptied selection produces.
    pub(crate) fn payload(
        &self,
        draft: Option<&AnswerDraft>,
    ) -> Result<AnswerPayload, AttemptError> {
        match &self.kind {
            QuestionKind::Numerical => {
                let raw = match draft {
                    Some(AnswerDraft::Numerical(raw)) => raw.trim(),
                    _ => "",
                };
                if raw.is_empty() {
                    return Ok(AnswerPayload::Numerical { numerical_answer: None });
                }
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| AttemptError::InvalidNumber(raw.to_string()))?;
                Ok(AnswerPayload::Numerical { numerical_answer: Some(value) })
            }
            QuestionKind::SingleCorrect { options } | QuestionKind::MultipleCorrect { options } => {
                let selected_option_ids = match draft {
                    Some(AnswerDraft::Choice(selected)) => options
                        .iter()
                        .filter(|option| selected.contains(&option.id))
                        .map(|option| option.id.clone())
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(AnswerPayload::Choice { selected_option_ids })
            }
        }
    }
}
