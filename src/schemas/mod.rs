pub mod attempt;
pub mod auth;
pub mod exam;
pub mod user;

use serde::Deserialize;

/// Error body shape used by the backend; either field may carry the reason.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) detail: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn reason(self) -> Option<String> {
        self.detail.or(self.message).or(self.error)
    }
}
