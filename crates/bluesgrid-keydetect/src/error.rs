//! Error types for key detection.

use thiserror::Error;

/// Failures inside the detection pipeline.
///
/// These never cross [`KeyDetector::detect`](crate::KeyDetector::detect);
/// they are logged and folded into a default result.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The source could not be opened or decoded.
    #[error("decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The source produced an unusable stream description.
    #[error("unsupported stream: {0}")]
    Unsupported(String),

    /// The worker thread could not be started.
    #[error("failed to start detection worker: {0}")]
    Worker(#[source] std::io::Error),
}

impl DetectError {
    /// Wrap any decoder error.
    pub fn decode(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Decode(Box::new(err))
    }
}

/// A key name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    /// Expected `"<note> <mode>"`.
    #[error("expected \"<note> <mode>\", got {0:?}")]
    Format(String),

    /// Unknown note name.
    #[error("unknown note {0:?}")]
    Note(String),

    /// Unknown mode name.
    #[error("unknown mode {0:?}")]
    Mode(String),
}

/// Result alias for detection internals.
pub type Result<T> = std::result::Result<T, DetectError>;
