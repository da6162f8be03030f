//! Upstream and transport errors for model calls.

/// The generation API answered with a non-success HTTP status.
///
/// Never repaired: it signals a provider or quota problem, not bad content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream generation API returned HTTP {status}: {body}")]
pub struct UpstreamError {
    /// HTTP status code returned by the upstream API.
    pub status: u16,
    /// Raw response body, kept for diagnostics.
    pub body: String,
}

/// All errors a [`crate::ModelClient`] can report.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Non-success HTTP status from the upstream API.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Connection, timeout or body-read failure before a status was known.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream answered 2xx but carried no completion text.
    #[error("upstream response contained no completion content")]
    EmptyContent,

    /// Failure inside the client itself (e.g. a panicked blocking task).
    #[error("internal model client error: {0}")]
    Internal(String),
}

impl ModelError {
    /// Returns the upstream error when this is the non-retryable class.
    pub fn as_upstream(&self) -> Option<&UpstreamError> {
        match self {
            ModelError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}
