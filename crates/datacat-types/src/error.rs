//! Runtime errors raised inside a running stage.

/// A failure that terminates the stage reporting it and, with it, the task.
///
/// There is no per-record recovery: a stage returns the first error it hits.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// File-system or socket I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field held a value the stage cannot process.
    #[error("data error: {message}")]
    Data { message: String },

    /// The consuming stage stopped reading before this stage finished sending.
    #[error("downstream stream closed before all records were delivered")]
    DownstreamClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Returns `true` when this error is only a consequence of another stage
    /// failing first (its consumer went away).
    #[must_use]
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::DownstreamClosed)
    }
}
