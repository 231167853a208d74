//! Audio decoding port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::{CaptureFormat, DecodedAudio};
use crate::domain::error::MalformedAudio;

/// Decode errors. No partial result accompanies any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Audio data could not be parsed: {0}")]
    Unparseable(String),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Unsupported channel layout: {0} channels")]
    UnsupportedLayout(usize),

    #[error("No decode context available")]
    ContextUnavailable,

    #[error("Decoded audio is malformed: {0}")]
    Malformed(#[from] MalformedAudio),
}

/// Port for turning captured or uploaded bytes into samples
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` described by `format`.
    ///
    /// Any decode context taken for the call is released before returning,
    /// on success and on failure alike.
    async fn decode(
        &self,
        bytes: Vec<u8>,
        format: CaptureFormat,
    ) -> Result<DecodedAudio, DecodeError>;
}
