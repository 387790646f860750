use std::fmt::Write;

use crate::attempt::{
    AnswerDraft, FinalizeMode, QuestionKind, QuestionStatus, Route, SessionEvent, SessionView,
};
use crate::core::time::{format_clock, format_offset};

pub(crate) fn view(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  [{} left]", view.title, format_clock(view.remaining_seconds));

    let Some(question) = &view.question else {
        out.push_str("No questions in this exam.");
        return out;
    };

    let _ = writeln!(
        out,
        "Question {}/{} ({}, {})",
        view.current_index + 1,
        view.question_count,
        question.kind.question_type().as_str(),
        status_label(view.status)
    );
    let _ = writeln!(out, "{}", question.statement);

    match &question.kind {
        QuestionKind::SingleCorrect { options } | QuestionKind::MultipleCorrect { options } => {
            let selected = match &view.draft {
                Some(AnswerDraft::Choice(selected)) => Some(selected),
                _ => None,
            };
            for option in options {
                let checked = selected.is_some_and(|ids| ids.contains(&option.id));
                let mark = if checked { 'x' } else { ' ' };
                let _ = writeln!(out, "  [{mark}] {}) {}", option.id, option.text);
            }
        }
        QuestionKind::Numerical => {
            let value = match &view.draft {
                Some(AnswerDraft::Numerical(raw)) if !raw.trim().is_empty() => raw.as_str(),
                _ => "(blank)",
            };
            let _ = writeln!(out, "  answer: {value}");
        }
    }

    if let Some(saved_at) = view.last_saved_at {
        let _ = write!(out, "Last saved {}", format_offset(saved_at));
    }
    out.trim_end().to_string()
}

pub(crate) fn grid(statuses: &[QuestionStatus], current: usize) -> String {
    statuses
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let mark = match status {
                QuestionStatus::Saved => '+',
                QuestionStatus::Unsaved => '*',
                QuestionStatus::NotAnswered => ' ',
            };
            if index == current {
                format!("<{}{mark}>", index + 1)
            } else {
                format!("[{}{mark}]", index + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line for events worth showing; ticks only print on whole minutes and
/// during the last ten seconds.
pub(crate) fn event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Loaded { title, question_count, remaining_seconds } => Some(format!(
            "Loaded {title}: {question_count} questions, {} left",
            format_clock(*remaining_seconds)
        )),
        SessionEvent::LoadFailed { message } => Some(format!("Could not load the exam: {message}")),
        SessionEvent::Tick { remaining_seconds } => {
            let remaining = *remaining_seconds;
            (remaining > 0 && (remaining % 60 == 0 || remaining <= 10))
                .then(|| format!("{} left", format_clock(remaining)))
        }
        SessionEvent::AnswerSaved { question_id } => {
            Some(format!("Saved answer for {question_id}"))
        }
        SessionEvent::SaveFailed { question_id, message } => {
            Some(format!("Could not save {question_id}: {message}"))
        }
        SessionEvent::SubmitFailed { message } => Some(format!("Submission failed: {message}")),
        SessionEvent::Navigate(Route::SubmissionComplete { exam_id, mode }) => {
            let how = match mode {
                FinalizeMode::ManualSubmit => "submitted",
                FinalizeMode::AutoDeadline => "submitted automatically, time is up",
            };
            Some(format!("Exam {exam_id} {how}."))
        }
    }
}

fn status_label(status: QuestionStatus) -> &'static str {
    match status {
        QuestionStatus::Saved => "saved",
        QuestionStatus::Unsaved => "unsaved",
        QuestionStatus::NotAnswered => "not answered",
    }
}
