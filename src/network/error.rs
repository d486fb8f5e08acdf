//! Classified network failures.
//!
//! Every transport failure is mapped to a [`NetworkError`] carrying a
//! user-facing message, the HTTP status (when one was received) and two
//! flags for timeout and missing connectivity. [`NetworkError::is_retryable`]
//! is the single source of truth for whether an attempt may be repeated.

use thiserror::Error;

/// A transport or HTTP-level failure, annotated for retry decisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct NetworkError {
    /// Human-readable description of the failure.
    pub message: String,
    /// HTTP status code when the server answered, `None` otherwise.
    pub status_code: Option<u16>,
    /// The request timed out.
    pub is_timeout: bool,
    /// The host was unreachable or the device is offline.
    pub is_no_connection: bool,
    /// Raw `Retry-After` header value, if the server sent one.
    pub retry_after: Option<String>,
    /// The URL that failed, when known.
    pub url: Option<String>,
}

impl NetworkError {
    /// Creates an unclassified failure carrying only a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            is_timeout: false,
            is_no_connection: false,
            retry_after: None,
            url: None,
        }
    }

    /// Creates an error for a non-success HTTP status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self {
            status_code: Some(status),
            url: Some(url.into()),
            ..Self::other(http_error_message(status))
        }
    }

    /// Creates an HTTP status error with a `Retry-After` header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self {
            retry_after,
            ..Self::http_status(url, status)
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self {
            is_timeout: true,
            url: Some(url.into()),
            ..Self::other("Network request timed out, please retry later")
        }
    }

    /// Creates the error returned when the connectivity probe reports offline.
    #[must_use]
    pub fn no_connection() -> Self {
        Self {
            is_no_connection: true,
            ..Self::other("Network unavailable, please check your connection")
        }
    }

    /// Creates an error for an unreachable host.
    pub fn unreachable(url: impl Into<String>) -> Self {
        Self {
            is_no_connection: true,
            url: Some(url.into()),
            ..Self::other("Unable to reach the server, please check your connection")
        }
    }

    /// Creates a generic transport failure (broken body, protocol error, ...).
    pub fn transport(url: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::other(format!("Network connection error: {detail}"))
        }
    }

    /// Classifies a `reqwest` failure.
    #[must_use]
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::timeout(url);
        }
        if error.is_connect() {
            return Self::unreachable(url);
        }
        if let Some(status) = error.status() {
            return Self::http_status(url, status.as_u16());
        }
        Self::transport(url, error)
    }

    /// Whether the failure came from a 5xx response.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code.is_some_and(|status| status >= 500)
    }

    /// Whether repeating the request may succeed: timeouts, 5xx and 429.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_timeout || self.is_server_error() || self.status_code == Some(429)
    }
}

/// Free-function form of [`NetworkError::is_retryable`].
#[must_use]
pub fn is_retryable(error: &NetworkError) -> bool {
    error.is_retryable()
}

/// Maps an HTTP status code to a fixed user-facing message.
#[must_use]
pub fn http_error_message(status: u16) -> String {
    let fixed = match status {
        400 => "Bad request parameters (400)",
        401 => "Unauthorized access (401)",
        403 => "Access forbidden (403)",
        404 => "The requested resource does not exist (404)",
        408 => "Request timed out (408)",
        429 => "Requests are too frequent, please retry later (429)",
        500 => "Internal server error (500)",
        502 => "Bad gateway (502)",
        503 => "Service temporarily unavailable (503)",
        504 => "Gateway timeout (504)",
        400..500 => return format!("Client error ({status})"),
        500.. => return format!("Server error ({status})"),
        _ => return format!("Network error ({status})"),
    };
    fixed.to_string()
}
