//! Error definitions for the response machinery.

use thiserror::Error;

/// Errors raised by a [`ResponseSink`](crate::http::ResponseSink) implementation.
///
/// The capturing response never adds variants of its own; whatever the
/// underlying response reports is handed back to the handler as-is.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Status line and header block were already rendered.
    #[error("Cannot modify headers after they are sent")]
    HeadersAlreadySent,

    /// The response was already ended.
    #[error("Write after end")]
    WriteAfterEnd,

    /// The response was destroyed before it could finish.
    #[error("Response destroyed")]
    Destroyed,

    /// Header or trailer name is not a valid HTTP token.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// Header or trailer value contains forbidden characters.
    #[error("Invalid value for header {name:?}")]
    InvalidHeaderValue { name: String },

    /// Reason phrase contains CR or LF.
    #[error("Invalid reason phrase: {0:?}")]
    InvalidReason(String),

    /// Text chunk could not be decoded with its declared encoding.
    #[error("Cannot decode chunk as {encoding}: {reason}")]
    InvalidEncoding {
        encoding: &'static str,
        reason: String,
    },

    /// Transport write failed.
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for response operations.
pub type ResponseResult<T> = Result<T, ResponseError>;
