//! Error types for sample sources.

use thiserror::Error;

/// Errors that can occur while fetching a sample from a node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl TransportError {
    /// Whether retrying the same request might succeed.
    ///
    /// RPC error objects and malformed payloads are answers, not outages,
    /// and are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Http(_) | TransportError::Connection(_) | TransportError::Timeout
        )
    }
}

#[cfg(feature = "json-rpc")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outages_are_retryable() {
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Connection("refused".into()).is_retryable());
        assert!(TransportError::Http("status 503".into()).is_retryable());
    }

    #[test]
    fn answers_are_not_retryable() {
        let rpc = TransportError::Rpc {
            code: -32601,
            message: "Method not found".into(),
        };
        assert!(!rpc.is_retryable());
        assert!(!TransportError::Parse("expected u64".into()).is_retryable());
    }

    #[test]
    fn rpc_error_display_includes_code() {
        let err = TransportError::Rpc {
            code: -32005,
            message: "Node is behind".into(),
        };
        assert_eq!(err.to_string(), "RPC error -32005: Node is behind");
    }
}
