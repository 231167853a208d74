//! Audio content types

use std::fmt;
use std::str::FromStr;

use crate::domain::error::UnsupportedContentType;

/// Compressed or containerised audio formats the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMimeType {
    Wav,
    Mpeg,
    Ogg,
    Webm,
    Mp4,
    Flac,
}

impl AudioMimeType {
    /// Get the canonical MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mpeg => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Webm => "audio/webm",
            Self::Mp4 => "audio/mp4",
            Self::Flac => "audio/flac",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mpeg => "mp3",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
            Self::Mp4 => "m4a",
            Self::Flac => "flac",
        }
    }

    /// Guess the type from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "mp3" => Some(Self::Mpeg),
            "ogg" | "oga" | "opus" => Some(Self::Ogg),
            "webm" => Some(Self::Webm),
            "m4a" | "mp4" => Some(Self::Mp4),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioMimeType {
    type Err = UnsupportedContentType;

    /// Parse a declared content type. Parameters such as `;codecs=opus` are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Ok(Self::Mpeg),
            "audio/ogg" => Ok(Self::Ogg),
            "audio/webm" => Ok(Self::Webm),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Ok(Self::Mp4),
            "audio/flac" | "audio/x-flac" => Ok(Self::Flac),
            _ => Err(UnsupportedContentType {
                content_type: s.to_string(),
            }),
        }
    }
}

/// The tag attached to capture bytes handed to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// A compressed or containerised stream
    Encoded(AudioMimeType),
    /// Raw interleaved little-endian f32 samples at the device's native layout
    PcmF32 { sample_rate: u32, channels: u16 },
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoded(mime) => write!(f, "{}", mime),
            Self::PcmF32 {
                sample_rate,
                channels,
            } => write!(
                f,
                "audio/pcm;format=f32le;rate={};channels={}",
                sample_rate, channels
            ),
        }
    }
}
