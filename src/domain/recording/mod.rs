//! Recording domain types

mod counter;
mod duration;
mod state;

pub use counter::{format_clock, DurationCounter, DurationDisplay};
pub use duration::{
    Duration, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CHAT_MAX_SECS, DEFAULT_ENROLL_MIN_SECS,
    DEFAULT_VERIFY_MAX_SECS,
};
pub use state::{InvalidStateTransition, RecordingState, RecordingStateMachine};
