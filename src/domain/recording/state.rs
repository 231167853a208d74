//! Recording state machine

use std::fmt;
use thiserror::Error;

/// Recording lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Processing,
    Error,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecordingState,
    pub action: &'static str,
}

/// Recording state machine.
/// Holds the single authoritative state; every change goes through a guarded transition.
///
/// State machine:
///   IDLE -> ACQUIRING (begin_acquiring)
///   ACQUIRING -> RECORDING (acquired)
///   RECORDING -> PROCESSING (stop)
///   ACQUIRING | RECORDING | PROCESSING -> IDLE (cancel)
///   PROCESSING -> IDLE (complete)
///   ACQUIRING | RECORDING | PROCESSING -> ERROR (fail)
///   ERROR -> IDLE (recover)
#[derive(Debug, Default)]
pub struct RecordingStateMachine {
    state: RecordingState,
}

impl RecordingStateMachine {
    /// Create a new state machine in idle state
    pub fn new() -> Self {
        Self {
            state: RecordingState::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecordingState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    fn transition(
        &mut self,
        allowed: &[RecordingState],
        next: RecordingState,
        action: &'static str,
    ) -> Result<RecordingState, InvalidStateTransition> {
        if !allowed.contains(&self.state) {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action,
            });
        }
        let previous = self.state;
        self.state = next;
        Ok(previous)
    }

    /// Transition from IDLE to ACQUIRING
    pub fn begin_acquiring(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Idle],
            RecordingState::Acquiring,
            "start recording",
        )
        .map(drop)
    }

    /// Transition from ACQUIRING to RECORDING
    pub fn acquired(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Acquiring],
            RecordingState::Recording,
            "begin capture",
        )
        .map(drop)
    }

    /// Transition from RECORDING to PROCESSING
    pub fn stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Recording],
            RecordingState::Processing,
            "stop recording",
        )
        .map(drop)
    }

    /// Transition back to IDLE discarding whatever is in flight.
    /// Returns the state that was cancelled.
    pub fn cancel(&mut self) -> Result<RecordingState, InvalidStateTransition> {
        self.transition(
            &[
                RecordingState::Acquiring,
                RecordingState::Recording,
                RecordingState::Processing,
            ],
            RecordingState::Idle,
            "cancel recording",
        )
    }

    /// Transition from PROCESSING to IDLE
    pub fn complete(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Processing],
            RecordingState::Idle,
            "complete processing",
        )
        .map(drop)
    }

    /// Enter ERROR from any active state
    pub fn fail(&mut self) -> Result<RecordingState, InvalidStateTransition> {
        self.transition(
            &[
                RecordingState::Acquiring,
                RecordingState::Recording,
                RecordingState::Processing,
            ],
            RecordingState::Error,
            "report failure",
        )
    }

    /// Transition from ERROR to IDLE so the user can retry
    pub fn recover(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Error],
            RecordingState::Idle,
            "recover",
        )
        .map(drop)
    }
}
