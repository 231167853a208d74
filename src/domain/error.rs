//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 5s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a declared content type is not an accepted audio type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported audio type: \"{content_type}\". Accepted: WAV, MP3, WEBM, OGG, M4A, FLAC")]
pub struct UnsupportedContentType {
    pub content_type: String,
}

/// Error when decoded sample data does not describe a usable clip
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedAudio {
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    ChannelCount(usize),

    #[error("channels hold different numbers of samples")]
    RaggedChannels,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
