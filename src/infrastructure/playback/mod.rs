//! Playback adapters

mod rodio_preview;
mod temp_file;

pub use rodio_preview::RodioPreviewPlayer;
pub use temp_file::TempFilePlaybackStore;
