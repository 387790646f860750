use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Show,
    Grid,
    SaveAndNext,
    Previous,
    /// Zero-based; typed one-based at the prompt.
    GoTo(usize),
    Choose(String),
    Numerical(String),
    Clear,
    Submit,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("empty command, type `help` for a list")]
    Empty,
    #[error("unknown command `{0}`, type `help` for a list")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{0}` is not a question number")]
    InvalidNumber(String),
}

pub(crate) const HELP: &str = "\
show            redraw the current question
grid            question overview (+ saved, * unsaved)
next | save     save this answer and move on
prev            previous question
goto N          jump to question N
choose OPTION   select (or toggle) an option by id
num VALUE       type a numerical answer, `num` alone blanks it
clear           forget this question's answer
submit          finish the exam
quit            leave without submitting";

pub(crate) fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(ParseError::Empty),
        "show" | "s" => Ok(Command::Show),
        "grid" | "g" => Ok(Command::Grid),
        "next" | "save" | "n" => Ok(Command::SaveAndNext),
        "prev" | "previous" | "p" => Ok(Command::Previous),
        "goto" | "go" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument("goto"));
            }
            match rest.parse::<usize>() {
                Ok(number) if number > 0 => Ok(Command::GoTo(number - 1)),
                _ => Err(ParseError::InvalidNumber(rest.to_string())),
            }
        }
        "choose" | "c" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument("choose"));
            }
            Ok(Command::Choose(rest.to_string()))
        }
        "num" => Ok(Command::Numerical(rest.to_string())),
        "clear" => Ok(Command::Clear),
        "submit" => Ok(Command::Submit),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
