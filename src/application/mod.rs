//! Application layer - Recording session, pipeline and controllers
//!
//! Contains the recording use cases and the trait definitions
//! for external system interactions.

pub mod controller;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod push_to_talk;
pub mod session;

// Re-export use cases
pub use controller::{CallSite, RecorderCallbacks, RecorderController, RecorderPolicy};
pub use error::RecorderError;
pub use pipeline::{convert_upload, PipelineError, UploadedFile};
pub use push_to_talk::PushToTalkButton;
pub use session::{
    RecordingSession, SessionConfig, SessionError, SessionEvent, SessionHandle, SessionStatus,
    StopReason,
};
