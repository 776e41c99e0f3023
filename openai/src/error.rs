use std::{fmt, time::Duration};

/// Errors that can arise when calling the chat-completion API.
#[derive(Debug)]
pub enum OpenAIError {
    /// Transport-level failures (connect, TLS, body read).
    Http(reqwest::Error),
    /// The request exceeded the configured timeout.
    Timeout,
    /// HTTP 429 from upstream.
    RateLimit {
        /// Upstream error message, if one was returned.
        message: String,
        /// Delay requested through the `Retry-After` header.
        retry_after: Option<Duration>,
    },
    /// Any other non-success HTTP status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Upstream error message, or the raw body when it is not an error envelope.
        message: String,
    },
    /// JSON serialization/deserialization errors.
    Json(serde_json::Error),
    /// API contract violations, such as a response without choices.
    Api(String),
}

impl fmt::Display for OpenAIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::RateLimit { message, .. } => write!(f, "rate limited: {message}"),
            Self::Status { status, message } => write!(f, "status {status}: {message}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
            Self::Api(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for OpenAIError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpenAIError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(value)
        }
    }
}

impl From<serde_json::Error> for OpenAIError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl OpenAIError {
    /// Whether a retry has a reasonable chance of succeeding.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::RateLimit { .. } => true,
            Self::Status { status, .. } => matches!(*status, 500 | 502 | 503 | 504),
            Self::Json(_) | Self::Api(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let server = OpenAIError::Status {
            status: 503,
            message: "overloaded".into(),
        };
        let bad_request = OpenAIError::Status {
            status: 400,
            message: "bad".into(),
        };
        assert!(server.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(OpenAIError::Timeout.is_retryable());
        assert!(!OpenAIError::Api("no choices".into()).is_retryable());
    }

    #[test]
    fn display_includes_upstream_message() {
        let err = OpenAIError::Status {
            status: 401,
            message: "Incorrect API key provided".into(),
        };
        assert_eq!(err.to_string(), "status 401: Incorrect API key provided");
    }
}
