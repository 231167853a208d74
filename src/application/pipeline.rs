//! Decode → encode pipeline for captured chunks and uploaded files

use std::io::Cursor;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::audio::{
    encode_wav, AudioFile, AudioMimeType, CaptureFormat, DecodedAudio, FinishedRecording,
    RecordingMetadata,
};
use crate::domain::error::UnsupportedContentType;

use super::error::RecorderError;
use super::ports::{AudioDecoder, DecodeError};

/// Upload path errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedContentType),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("File contains no audio")]
    EmptyCapture,
}

impl PipelineError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "Unsupported file type. Please upload a WAV or MP3 file.",
            Self::TooLarge { .. } => "File is too large. Please upload a shorter recording.",
            Self::Decode(_) => "Failed to process audio. Please try again.",
            Self::EmptyCapture => "No audio found in the file. Please try another one.",
        }
    }
}

/// A user-picked file entering the pipeline at the decode stage
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Declared content type, e.g. `audio/mpeg`
    pub content_type: String,
}

/// Encode decoded audio and wrap it in a timestamped file
pub fn finish(decoded: &DecodedAudio, duration_secs: u64, prefix: &str) -> FinishedRecording {
    let bytes = encode_wav(decoded);
    let metadata = metadata_for(decoded, duration_secs, bytes.len());
    FinishedRecording {
        file: AudioFile::timestamped_wav(prefix, bytes),
        metadata,
    }
}

fn metadata_for(decoded: &DecodedAudio, duration_secs: u64, size_bytes: usize) -> RecordingMetadata {
    RecordingMetadata {
        duration_secs,
        frames: decoded.frames() as u64,
        sample_rate: decoded.sample_rate(),
        channels: decoded.channel_count(),
        size_bytes,
    }
}

/// Run captured bytes through decode and encode.
///
/// `duration_secs` is the tick count of the session that captured the bytes.
pub async fn process_capture(
    decoder: &dyn AudioDecoder,
    bytes: Vec<u8>,
    format: CaptureFormat,
    duration_secs: u64,
    prefix: &str,
) -> Result<FinishedRecording, RecorderError> {
    if bytes.is_empty() {
        return Err(RecorderError::EmptyCapture);
    }

    debug!(bytes = bytes.len(), %format, "Decoding capture");
    let decoded = decoder.decode(bytes, format).await?;
    if decoded.is_empty() {
        return Err(RecorderError::EmptyCapture);
    }

    let finished = finish(&decoded, duration_secs, prefix);
    info!(
        name = finished.file.name(),
        frames = finished.metadata.frames,
        size = finished.metadata.size_bytes,
        "Recording encoded"
    );
    Ok(finished)
}

/// Convert an uploaded file into the canonical container.
///
/// Canonical 16-bit PCM WAV passes through unchanged; everything else is
/// decoded and re-encoded. The output keeps the upload's stem.
pub async fn convert_upload(
    decoder: &dyn AudioDecoder,
    upload: UploadedFile,
    max_bytes: u64,
) -> Result<FinishedRecording, PipelineError> {
    let mime: AudioMimeType = upload.content_type.parse()?;

    let size = upload.bytes.len() as u64;
    if size > max_bytes {
        return Err(PipelineError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    if upload.bytes.is_empty() {
        return Err(PipelineError::EmptyCapture);
    }

    if mime == AudioMimeType::Wav {
        if let Some(metadata) = canonical_wav_metadata(&upload.bytes) {
            debug!(name = %upload.name, "Upload is canonical WAV, passing through");
            if metadata.frames == 0 {
                return Err(PipelineError::EmptyCapture);
            }
            return Ok(FinishedRecording {
                file: AudioFile::renamed_wav(&upload.name, upload.bytes),
                metadata,
            });
        }
    }

    debug!(name = %upload.name, %mime, size, "Decoding upload");
    let decoded = decoder
        .decode(upload.bytes, CaptureFormat::Encoded(mime))
        .await?;
    if decoded.is_empty() {
        return Err(PipelineError::EmptyCapture);
    }

    let bytes = encode_wav(&decoded);
    let metadata = metadata_for(&decoded, decoded.duration_secs() as u64, bytes.len());
    Ok(FinishedRecording {
        file: AudioFile::renamed_wav(&upload.name, bytes),
        metadata,
    })
}

/// Metadata for 16-bit integer PCM WAV with at most two channels
fn canonical_wav_metadata(bytes: &[u8]) -> Option<RecordingMetadata> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int
        || spec.bits_per_sample != 16
        || !(1..=2).contains(&spec.channels)
        || spec.sample_rate == 0
    {
        return None;
    }

    let frames = reader.duration() as u64;
    Some(RecordingMetadata {
        duration_secs: frames / spec.sample_rate as u64,
        frames,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        size_bytes: bytes.len(),
    })
}
