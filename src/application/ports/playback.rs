//! Playback handle port interface

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::AudioFile;

/// Playback store errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to create playback handle: {0}")]
    CreateFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Audio output device not available: {0}")]
    DeviceNotAvailable(String),
}

/// Ephemeral local reference to a finished recording.
///
/// Not `Clone`: the only way to give it up is [`PlaybackStore::release`],
/// so each handle is released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct PlaybackHandle {
    id: u64,
    location: PathBuf,
}

impl PlaybackHandle {
    pub fn new(id: u64, location: impl Into<PathBuf>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// URL-like form of the handle
    pub fn url(&self) -> String {
        format!("file://{}", self.location.display())
    }
}

/// Port for creating and releasing playback handles
pub trait PlaybackStore: Send + Sync {
    fn create(&self, file: &AudioFile) -> Result<PlaybackHandle, PlaybackError>;

    fn release(&self, handle: PlaybackHandle);

    /// Number of handles created and not yet released
    fn live_handles(&self) -> usize;
}

/// Port for audible preview of a playback handle
#[async_trait]
pub trait PreviewPlayer: Send + Sync {
    /// Play the recording at `location` to the end
    async fn play(&self, location: &Path) -> Result<(), PlaybackError>;
}
