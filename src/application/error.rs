//! Failures surfaced at the recorder boundary

use thiserror::Error;

use super::ports::{CaptureError, DecodeError};

/// Every way a recording cycle can end without a file.
///
/// Hosts only ever see [`RecorderError::user_message`]; the `Display` form
/// carries detail for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("Capture facility unavailable on this platform")]
    UnsupportedPlatform,

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to acquire microphone: {0}")]
    AcquisitionFailed(String),

    #[error("Microphone lost while recording: {0}")]
    DeviceLost(String),

    #[error("No audio captured")]
    EmptyCapture,

    #[error("Failed to decode captured audio: {0}")]
    DecodeFailed(String),
}

impl RecorderError {
    /// The single message shown to the user for this failure
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform => "Recording is not supported on this platform.",
            Self::PermissionDenied(_) | Self::AcquisitionFailed(_) => {
                "Could not access the microphone. Please allow permission."
            }
            Self::DeviceLost(_) => "The microphone stopped responding. Please try again.",
            Self::EmptyCapture => "No audio captured. Please try recording again.",
            Self::DecodeFailed(_) => "Failed to process audio. Please try again.",
        }
    }

    /// Whether retrying can help
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnsupportedPlatform)
    }
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::UnsupportedPlatform => Self::UnsupportedPlatform,
            CaptureError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            CaptureError::NoDevice | CaptureError::Timeout => {
                Self::AcquisitionFailed(err.to_string())
            }
            CaptureError::AcquisitionFailed(msg) => Self::AcquisitionFailed(msg),
            CaptureError::DeviceLost(msg) => Self::DeviceLost(msg),
        }
    }
}

impl From<DecodeError> for RecorderError {
    fn from(err: DecodeError) -> Self {
        Self::DecodeFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_errors_map_to_recorder_errors() {
        assert_eq!(
            RecorderError::from(CaptureError::UnsupportedPlatform),
            RecorderError::UnsupportedPlatform
        );
        assert!(matches!(
            RecorderError::from(CaptureError::Timeout),
            RecorderError::AcquisitionFailed(_)
        ));
        assert!(matches!(
            RecorderError::from(CaptureError::NoDevice),
            RecorderError::AcquisitionFailed(_)
        ));
        assert!(matches!(
            RecorderError::from(CaptureError::DeviceLost("unplugged".into())),
            RecorderError::DeviceLost(_)
        ));
    }

    #[test]
    fn decode_errors_become_decode_failed() {
        let err = RecorderError::from(DecodeError::ContextUnavailable);
        assert_eq!(
            err,
            RecorderError::DecodeFailed("No decode context available".into())
        );
        assert_eq!(err.user_message(), "Failed to process audio. Please try again.");
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            RecorderError::EmptyCapture.user_message(),
            "No audio captured. Please try recording again."
        );
        assert_eq!(
            RecorderError::PermissionDenied("denied".into()).user_message(),
            "Could not access the microphone. Please allow permission."
        );
        assert_eq!(
            RecorderError::UnsupportedPlatform.user_message(),
            "Recording is not supported on this platform."
        );
    }

    #[test]
    fn only_unsupported_platform_is_final() {
        assert!(!RecorderError::UnsupportedPlatform.is_recoverable());
        assert!(RecorderError::EmptyCapture.is_recoverable());
        assert!(RecorderError::DecodeFailed("x".into()).is_recoverable());
    }
}
