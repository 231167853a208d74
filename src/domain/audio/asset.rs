//! Finished audio files handed to the calling feature

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::content_type::AudioMimeType;

/// File name prefix for form-recorder output
pub const RECORDING_PREFIX: &str = "voice-recording";

/// File name prefix for push-to-talk output
pub const CHAT_PREFIX: &str = "voice-chat";

/// Named, typed audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    name: String,
    mime_type: AudioMimeType,
    data: Vec<u8>,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, mime_type: AudioMimeType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            data,
        }
    }

    /// Canonical WAV file named `<prefix>-<unix millis>.wav`
    pub fn timestamped_wav(prefix: &str, data: Vec<u8>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self::new(
            format!("{}-{}.{}", prefix, millis, AudioMimeType::Wav.extension()),
            AudioMimeType::Wav,
            data,
        )
    }

    /// WAV file named after an uploaded original, extension replaced
    pub fn renamed_wav(original_name: &str, data: Vec<u8>) -> Self {
        Self::new(wav_name_for(original_name), AudioMimeType::Wav, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Replace the extension of `name` with `.wav`
pub fn wav_name_for(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("recording");
    format!("{}.wav", stem)
}

/// Measurements taken when a recording finishes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordingMetadata {
    /// Tick-counted seconds; the value minimum-duration gates compare against
    pub duration_secs: u64,
    pub frames: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub size_bytes: usize,
}

impl RecordingMetadata {
    /// Length implied by the encoded frames
    pub fn audio_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// A finished recording: the file plus its measurements
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRecording {
    pub file: AudioFile,
    pub metadata: RecordingMetadata,
}
