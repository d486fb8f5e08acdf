//! Errors returned by import sessions.

use thiserror::Error;

use crate::network::NetworkError;
use crate::store::StoreError;

/// Why an import or resume did not complete.
///
/// Cancellation is not an error; see [`super::ImportOutcome`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// A page could not be fetched, after any retries.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// A page was fetched but did not yield what the rule promised.
    #[error("failed to parse {url}: {message}")]
    Parse {
        message: String,
        url: String,
    },

    /// An input was rejected before any request was made.
    #[error("invalid {field}")]
    Validation {
        /// `url` or the first missing rule field.
        field: String,
    },

    /// Persisting records failed.
    #[error(transparent)]
    Database(#[from] StoreError),

    /// Resume was asked for a novel that is not stored.
    #[error("novel not found: {0}")]
    NovelNotFound(i64),

    /// Another session is running on this orchestrator.
    #[error("an import is already running")]
    AlreadyRunning,
}

impl ImportError {
    pub(crate) fn parse(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            url: url.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Whether running the same session again could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(error) => error.is_retryable() || error.is_no_connection,
            Self::AlreadyRunning => true,
            _ => false,
        }
    }
}
