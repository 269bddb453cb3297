use serde::Serialize;
use std::fmt;

/// Non-fatal warning raised while normalizing a rulebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulebookDiagnostic {
    pub block_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<usize>,
    pub message: String,
}

impl RulebookDiagnostic {
    pub(crate) fn block(block_id: &str, message: impl Into<String>) -> Self {
        Self {
            block_id: block_id.to_string(),
            option: None,
            message: message.into(),
        }
    }

    /// `option` is 1-based, matching how rulebook authors count entries.
    pub(crate) fn option(block_id: &str, option: usize, message: impl Into<String>) -> Self {
        Self {
            block_id: block_id.to_string(),
            option: Some(option),
            message: message.into(),
        }
    }
}

impl fmt::Display for RulebookDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.option {
            Some(option) => write!(f, "{} option #{}: {}", self.block_id, option, self.message),
            None => write!(f, "{}: {}", self.block_id, self.message),
        }
    }
}
