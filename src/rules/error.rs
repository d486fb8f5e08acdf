//! Error types for rule operations.

use thiserror::Error;

/// Errors from the rule store.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Required rule fields are blank.
    #[error("rule is missing required fields: {}", missing_fields.join(", "))]
    Invalid {
        /// Missing field names in reporting order.
        missing_fields: Vec<&'static str>,
    },

    /// No rule with this id exists.
    #[error("rule not found: {0}")]
    NotFound(i64),

    /// An update was attempted on a rule that was never saved.
    #[error("rule '{0}' has no id")]
    Unsaved(String),

    /// No stored rule applies to the URL.
    #[error("no parser rule matches {url}")]
    NoMatch {
        /// The URL that was matched.
        url: String,
    },

    /// Database operation failed.
    #[error("rule database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RuleError {
    /// The first missing field, if this is a validation failure.
    #[must_use]
    pub fn first_missing_field(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { missing_fields } => missing_fields.first().copied(),
            _ => None,
        }
    }
}
