use crate::sample::{Axis, Stream};

/// Errors surfaced while handling a single sample or talking to the
/// configuration sink. None of them end a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("malformed {stream} sample: missing {axis} axis")]
    MalformedSample { stream: Stream, axis: Axis },

    #[error("malformed {stream} sample: {axis} axis is not finite")]
    NonFinite { stream: Stream, axis: Axis },

    #[error("unknown stream: {0}")]
    UnknownStream(String),

    #[error("configuration push failed: {0}")]
    PushFailed(String),
}
