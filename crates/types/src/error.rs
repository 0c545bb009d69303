//! Error taxonomy for the adapter pipeline.

use thiserror::Error;

/// Errors surfaced by the validate → fetch → encode pipeline.
///
/// Validator and limit errors are fatal and terminate the pipeline with no
/// partial output. [`AdapterError::Upstream`] wraps a single provider's
/// failure and is recovered locally by the fetcher unless the aggregate
/// misses quorum. Every message is human-readable; the on-chain bridge
/// relays it back to the original requester unmodified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("parameter '{name}' must be {expected}, got {actual}")]
    TypeMismatch { name: String, expected: String, actual: String },

    #[error("source '{name}' is not a configured feed")]
    UnknownSource { name: String },

    #[error("{requested} queries planned but only {allowed} allowed")]
    QueryLimitExceeded { requested: usize, allowed: usize },

    #[error("quorum not met: {got} of {required} required responses succeeded")]
    QuorumNotMet { required: usize, got: usize },

    #[error("encoded response is {actual} bytes, exceeding the {limit} byte limit")]
    ResponseTooLarge { limit: usize, actual: usize },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("upstream '{provider}' failed: {message}")]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },
}

impl AdapterError {
    /// Create a missing-parameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create a type-mismatch error naming the offending field.
    pub fn type_mismatch(name: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unknown-source error.
    pub fn unknown_source(name: impl Into<String>) -> Self {
        Self::UnknownSource { name: name.into() }
    }

    /// Create an upstream failure wrapper for a single provider.
    pub fn upstream(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let err = AdapterError::missing_parameter("source");
        assert_eq!(err.to_string(), "missing required parameter 'source'");

        let err = AdapterError::type_mismatch("numAllowedQueries", "an integer", "a string");
        assert!(err.to_string().contains("numAllowedQueries"));
        assert!(err.to_string().contains("an integer"));
    }

    #[test]
    fn quorum_message_reports_both_counts() {
        let err = AdapterError::QuorumNotMet { required: 2, got: 1 };
        assert_eq!(err.to_string(), "quorum not met: 1 of 2 required responses succeeded");
    }
}
