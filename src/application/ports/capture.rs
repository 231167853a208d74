//! Microphone capture port interface

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::audio::{CaptureChunk, CaptureFormat};

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("No capture facility on this platform")]
    UnsupportedPlatform,

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No input device available")]
    NoDevice,

    #[error("Failed to open input device: {0}")]
    AcquisitionFailed(String),

    #[error("Timed out waiting for the input device")]
    Timeout,

    #[error("Input device stopped: {0}")]
    DeviceLost(String),
}

/// Ordered chunk feed from a live device.
/// A `None` from the receiver means the device went away.
pub type ChunkReceiver = mpsc::UnboundedReceiver<Result<CaptureChunk, CaptureError>>;

/// Live hardware handle returned by a successful acquisition.
///
/// `release` must be idempotent: the session calls it exactly once per exit
/// path, but adapters may also release on drop.
pub trait DeviceHandle: Send {
    /// Stop the device and free the hardware
    fn release(&mut self);

    /// Whether the hardware is still held
    fn is_live(&self) -> bool;
}

/// Everything a successful acquisition hands to the session
pub struct CaptureStream {
    pub format: CaptureFormat,
    pub chunks: ChunkReceiver,
    pub device: Box<dyn DeviceHandle>,
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("format", &self.format)
            .field("live", &self.device.is_live())
            .finish()
    }
}

/// Port for the host capture facility
#[async_trait]
pub trait CaptureFacility: Send + Sync {
    /// Acquire the default input device and start streaming.
    ///
    /// May suspend for as long as the platform takes to grant access.
    /// Dropping the returned future before it resolves must not leave a
    /// device open.
    async fn acquire(&self) -> Result<CaptureStream, CaptureError>;
}
