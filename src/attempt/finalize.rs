/// How an attempt reached its final submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeMode {
    /// Candidate pressed submit and confirmed.
    ManualSubmit,
    /// The countdown reached zero.
    AutoDeadline,
}

impl FinalizeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalizeMode::ManualSubmit => "manual",
            FinalizeMode::AutoDeadline => "auto_deadline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { mode: FinalizeMode, finalized: bool },
    Cancelled,
    AlreadySubmitting,
    AlreadySubmitted,
    NotActive,
}
