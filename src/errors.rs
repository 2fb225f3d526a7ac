//! Error types for encode and decode operations.
//!
//! Internal decoding disturbances (a lost sync, a line length matching no
//! mode) are recovered by the state machine and never surface here; these
//! types carry only the failures of the injected collaborators and misuse
//! of the API.

use thiserror::Error;

use crate::modes::Mode;

/// Top-level error for all operations.
#[derive(Debug, Error)]
pub enum SstvError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Failures surfaced by `decode_image`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("sample source failed: {reason}")]
    SourceFailed { reason: String },

    #[error("sample stream ended before an image completed")]
    SourceExhausted,

    #[error("pixel sink failed: {reason}")]
    SinkFailed { reason: String },
}

/// Failures surfaced by `generate_sstv`.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("sample sink failed: {reason}")]
    SinkFailed { reason: String },

    #[error("mode {mode} has no VIS assignment and cannot be transmitted")]
    UnsupportedMode { mode: Mode },
}

pub type Result<T> = std::result::Result<T, SstvError>;
