use thiserror::Error;

/// Failures that end a request. Server-sent error records are not errors at
/// this level: they arrive as [`crate::DisplayEvent::Error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OmlError {
    /// Connecting or sending failed before any body bytes were read.
    #[error("transport: {0}")]
    Transport(String),
    /// The response body failed while it was being streamed.
    #[error("read: {0}")]
    Read(String),
    #[error("read: line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    /// The task driving the request panicked or was aborted.
    #[error("task: {0}")]
    Task(String),
}
