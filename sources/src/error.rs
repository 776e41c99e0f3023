use thiserror::Error;

/// Failure of a single open-data fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure, including timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("portal returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a JSON array of records.
    #[error("malformed dataset response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether the fetch gave up because the timeout elapsed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_timeout())
    }
}
