//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with cpal, symphonia, rodio and the filesystem.

pub mod capture;
pub mod config;
pub mod decoding;
pub mod playback;

// Re-export adapters
pub use capture::CpalCaptureFacility;
pub use config::XdgConfigStore;
pub use decoding::SymphoniaDecoder;
pub use playback::{RodioPreviewPlayer, TempFilePlaybackStore};
