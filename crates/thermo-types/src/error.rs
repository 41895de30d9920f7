//! Error types for frame parsing in thermo-types.

use thiserror::Error;

use crate::frame::MessageType;

/// Reasons a byte window was not turned into a [`Frame`](crate::Frame).
///
/// The stream decoders never surface these; they treat every rejection as
/// "no reading here". The error form exists for diagnostics and tooling that
/// want to know why a window was dropped.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// Fewer bytes were available than a frame needs.
    #[error("Insufficient bytes: expected {expected}, got {actual}")]
    InsufficientBytes { expected: usize, actual: usize },

    /// The frame carries a message type other than a temperature reading.
    #[error("Unsupported message type: {0}")]
    UnsupportedType(MessageType),
}

/// Result type alias using thermo-types' FrameError type.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
