//! Error kinds and propagation policy.

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds produced by the memory engine.
///
/// Propagation policy:
/// - Core CRUD surfaces [`Error::InvalidInput`], [`Error::NotFound`] and
///   [`Error::StoreFailure`] directly to the caller.
/// - Latency-bounded retrieval (passive retrieval, next-scene prediction)
///   swallows [`Error::DeadlineExceeded`], [`Error::LlmFailure`],
///   [`Error::EmbedFailure`] and [`Error::StoreFailure`], returning an
///   empty result and incrementing a metric instead.
/// - Background agents log and continue; a single iteration's failure
///   never stops the loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("embedding failed: {0}")]
    EmbedFailure(String),

    #[error("llm call failed: {0}")]
    LlmFailure(String),

    #[error("store operation failed: {0}")]
    StoreFailure(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether a retriable/background caller should log-and-continue
    /// rather than surface this error to the user.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DeadlineExceeded
                | Error::Cancelled
                | Error::EmbedFailure(_)
                | Error::LlmFailure(_)
                | Error::StoreFailure(_)
        )
    }

    /// Whether latency-bounded retrieval should swallow this error and
    /// return an empty result.
    #[must_use]
    pub fn is_swallowed_by_latency_bounded_retrieval(&self) -> bool {
        matches!(
            self,
            Error::DeadlineExceeded
                | Error::LlmFailure(_)
                | Error::EmbedFailure(_)
                | Error::StoreFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(Error::DeadlineExceeded.is_recoverable());
        assert!(Error::StoreFailure("x".into()).is_recoverable());
        assert!(!Error::InvalidInput("x".into()).is_recoverable());
        assert!(!Error::NotFound("x".into()).is_recoverable());
    }

    #[test]
    fn latency_bounded_swallow_set() {
        assert!(Error::DeadlineExceeded.is_swallowed_by_latency_bounded_retrieval());
        assert!(Error::EmbedFailure("x".into()).is_swallowed_by_latency_bounded_retrieval());
        assert!(!Error::InvalidInput("x".into()).is_swallowed_by_latency_bounded_retrieval());
    }
}
