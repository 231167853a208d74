//! Push-to-talk variant of the recorder controller
//!
//! Holding the button records; releasing it stops and encodes. Losing the
//! gesture (pointer leaves the button, touch cancelled) discards instead.

use tracing::debug;

use crate::domain::recording::RecordingState;

use super::controller::RecorderController;

/// Hold-to-record button
pub struct PushToTalkButton {
    controller: RecorderController,
}

impl PushToTalkButton {
    pub fn new(controller: RecorderController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &RecorderController {
        &self.controller
    }

    /// The button accepts no presses while disabled or while a take is processing
    pub fn is_interactive(&self) -> bool {
        !self.controller.is_disabled() && self.controller.state() != RecordingState::Processing
    }

    pub fn is_recording(&self) -> bool {
        self.controller.state() == RecordingState::Recording
    }

    /// Press: start recording
    pub async fn pointer_down(&self) {
        if !self.is_interactive() {
            debug!("Push-to-talk not interactive, ignoring press");
            return;
        }
        self.controller.start().await;
    }

    /// Release: stop and encode. A release before the microphone is live
    /// leaves nothing worth encoding, so the attempt is dropped.
    pub async fn pointer_up(&self) {
        self.controller.release().await;
    }

    /// Gesture lost: discard, never encode
    pub async fn pointer_leave(&self) {
        self.controller.leave().await;
    }

    pub async fn shutdown(self) {
        self.controller.shutdown().await;
    }
}
