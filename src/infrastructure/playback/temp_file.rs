//! Playback handles backed by scoped temp files

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::application::ports::{PlaybackError, PlaybackHandle, PlaybackStore};
use crate::domain::audio::AudioFile;

/// Writes each finished recording to its own temp file.
///
/// Releasing a handle deletes the file.
#[derive(Default)]
pub struct TempFilePlaybackStore {
    next_id: AtomicU64,
    files: Mutex<HashMap<u64, NamedTempFile>>,
}

impl TempFilePlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackStore for TempFilePlaybackStore {
    fn create(&self, file: &AudioFile) -> Result<PlaybackHandle, PlaybackError> {
        let mut temp = tempfile::Builder::new()
            .prefix("voice-capture-")
            .suffix(&format!(".{}", file.mime_type().extension()))
            .tempfile()
            .map_err(|e| PlaybackError::CreateFailed(e.to_string()))?;
        temp.write_all(file.data())
            .and_then(|_| temp.flush())
            .map_err(|e| PlaybackError::CreateFailed(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = PlaybackHandle::new(id, temp.path());
        debug!(id, path = %temp.path().display(), "Created playback handle");

        let mut files = self
            .files
            .lock()
            .map_err(|_| PlaybackError::CreateFailed("playback store poisoned".into()))?;
        files.insert(id, temp);
        Ok(handle)
    }

    fn release(&self, handle: PlaybackHandle) {
        let Ok(mut files) = self.files.lock() else {
            warn!(id = handle.id(), "Playback store poisoned, handle leaked");
            return;
        };
        if let Some(temp) = files.remove(&handle.id()) {
            if let Err(e) = temp.close() {
                warn!(id = handle.id(), error = %e, "Failed to delete playback file");
            }
            debug!(id = handle.id(), "Released playback handle");
        }
    }

    fn live_handles(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> AudioFile {
        AudioFile::timestamped_wav("voice-recording", vec![1, 2, 3, 4])
    }

    #[test]
    fn create_writes_contents() {
        let store = TempFilePlaybackStore::new();
        let handle = store.create(&file()).unwrap();

        assert_eq!(std::fs::read(handle.location()).unwrap(), vec![1, 2, 3, 4]);
        assert!(handle.url().starts_with("file://"));
        assert!(handle.location().to_string_lossy().ends_with(".wav"));
        assert_eq!(store.live_handles(), 1);
    }

    #[test]
    fn release_deletes_file() {
        let store = TempFilePlaybackStore::new();
        let handle = store.create(&file()).unwrap();
        let path = handle.location().to_path_buf();

        store.release(handle);
        assert!(!path.exists());
        assert_eq!(store.live_handles(), 0);
    }

    #[test]
    fn handles_are_distinct() {
        let store = TempFilePlaybackStore::new();
        let a = store.create(&file()).unwrap();
        let b = store.create(&file()).unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.location(), b.location());
        store.release(a);
        assert_eq!(store.live_handles(), 1);
        assert!(b.location().exists());
    }
}
