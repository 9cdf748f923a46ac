//! # Decode Error Types
//!
//! Error taxonomy for the decode pipeline, plus the numeric status codes
//! surfaced to embedding hosts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while opening, seeking or decoding an audio source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Source could not be read or is not a recognised container.
    #[error("Failed to open audio source: {0}")]
    Open(String),

    /// Container headers or stream information could not be read.
    #[error("Failed to read stream metadata: {0}")]
    Metadata(String),

    /// Container holds no audio stream.
    #[error("No audio stream found: {0}")]
    NoAudioStream(String),

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Codec of the selected stream has no decoder in this build.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Decoder exists but rejected the stream's codec parameters.
    #[error("Failed to initialize decoder: {0}")]
    DecoderInit(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// Start offset could not be converted or the seek primitive failed.
    #[error("Seek failed: {0}")]
    Seek(String),

    /// Submitting a compressed packet to the decoder failed.
    #[error("Failed to decode packet: {0}")]
    PacketDecode(String),

    /// Receiving a decoded frame from the decoder failed.
    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    /// Decoded frame uses a sample encoding outside the normaliser's matrix.
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// Sample-rate conversion failed.
    #[error("Resampling failed: {0}")]
    Resample(String),

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Request parameters or configuration are invalid.
    #[error("Invalid decode request: {0}")]
    InvalidRequest(String),
}

impl DecodeError {
    /// Stable numeric status for this error. Always negative.
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            DecodeError::Open(_) => -1,
            DecodeError::Metadata(_) => -2,
            DecodeError::NoAudioStream(_) => -3,
            DecodeError::UnsupportedCodec(_) => -4,
            DecodeError::DecoderInit(_) => -5,
            DecodeError::Seek(_) => -6,
            DecodeError::PacketDecode(_) => -7,
            DecodeError::FrameDecode(_) => -8,
            DecodeError::UnsupportedSampleFormat(_) => -9,
            DecodeError::Resample(_) => -10,
            DecodeError::InvalidRequest(_) => -11,
        };
        StatusCode(code)
    }

    /// Returns `true` if the error happened while opening the source, before
    /// any sample was decoded.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            DecodeError::Open(_)
                | DecodeError::Metadata(_)
                | DecodeError::NoAudioStream(_)
                | DecodeError::UnsupportedCodec(_)
                | DecodeError::DecoderInit(_)
        )
    }

    /// Returns `true` if the error happened mid-stream.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            DecodeError::PacketDecode(_)
                | DecodeError::FrameDecode(_)
                | DecodeError::UnsupportedSampleFormat(_)
                | DecodeError::Resample(_)
        )
    }
}

/// Numeric request status. `0` is success, anything else identifies a
/// [`DecodeError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Success status.
    pub const OK: StatusCode = StatusCode(0);

    /// Returns `true` for the success status.
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }
}

impl From<&DecodeError> for StatusCode {
    fn from(err: &DecodeError) -> Self {
        err.status_code()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
