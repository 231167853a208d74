//! Rodio-based preview of finished recordings

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};

use crate::application::ports::{PlaybackError, PreviewPlayer};

/// Plays a recording through the default output device
pub struct RodioPreviewPlayer;

impl RodioPreviewPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RodioPreviewPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewPlayer for RodioPreviewPlayer {
    async fn play(&self, location: &Path) -> Result<(), PlaybackError> {
        let location = location.to_path_buf();
        // Output streams block until drained
        tokio::task::spawn_blocking(move || play_sync(location))
            .await
            .map_err(|e| PlaybackError::PlaybackFailed(format!("Task join error: {}", e)))?
    }
}

fn play_sync(location: PathBuf) -> Result<(), PlaybackError> {
    let file = File::open(&location).map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))?;

    let (_stream, stream_handle) = OutputStream::try_default()
        .map_err(|e| PlaybackError::DeviceNotAvailable(e.to_string()))?;
    let sink =
        Sink::try_new(&stream_handle).map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
