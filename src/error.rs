//! Error types and handling for pullstream
//!
//! A subscription carries at most one terminal signal. When that signal is
//! an error, it is one of the variants below; stages never swallow it.

/// Main error type for pullstream operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Protocol violation: `request(0)` on a live subscription
    #[error("invalid demand: request(0) is a protocol violation")]
    InvalidDemand,
    /// A mapper or predicate panicked or returned an error
    #[error("transform fault: {0}")]
    TransformFault(String),
    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
    /// Custom error with message
    #[error("stream error: {0}")]
    Custom(String),
}

/// Result type for pullstream operations
pub type StreamResult<T> = Result<T, StreamError>;
