//! Tick-driven duration counter and its display label

use std::fmt;

use super::duration::Duration;

/// Whole seconds elapsed since capture began.
/// Driven by the one-second tick, never by chunk arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationCounter {
    elapsed_secs: u64,
}

impl DurationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.elapsed_secs = 0;
    }

    /// Advance by one tick and return the new elapsed value
    pub fn tick(&mut self) -> u64 {
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        self.elapsed_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Whether the caller-supplied ceiling has been reached.
    /// An absent ceiling is never reached.
    pub fn reached(&self, max: Option<Duration>) -> bool {
        match max {
            Some(max) => self.elapsed_secs >= max.as_secs(),
            None => false,
        }
    }
}

/// What the duration indicator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationDisplay {
    Elapsed(u64),
    Remaining(u64),
}

impl DurationDisplay {
    /// Remaining time while a ceiling is configured, elapsed time otherwise
    pub fn for_counter(elapsed_secs: u64, max: Option<Duration>) -> Self {
        match max {
            Some(max) => Self::Remaining(max.as_secs().saturating_sub(elapsed_secs)),
            None => Self::Elapsed(elapsed_secs),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Elapsed(_) => "elapsed",
            Self::Remaining(_) => "remaining",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Self::Elapsed(secs) | Self::Remaining(secs) => *secs,
        }
    }
}

impl fmt::Display for DurationDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_clock(self.seconds()), self.label())
    }
}

/// Format seconds as `mm:ss`
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
