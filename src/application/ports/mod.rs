//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod decoder;
pub mod playback;

// Re-export common types
pub use capture::{CaptureError, CaptureFacility, CaptureStream, ChunkReceiver, DeviceHandle};
pub use config::{ConfigChange, ConfigStore};
pub use decoder::{AudioDecoder, DecodeError};
pub use playback::{PlaybackError, PlaybackHandle, PlaybackStore, PreviewPlayer};
