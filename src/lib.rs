//! VoiceCapture - microphone capture and canonical WAV encoding
//!
//! This crate records voice samples from the microphone, decodes whatever the
//! capture device or an uploaded file produced, and re-encodes it as 16-bit
//! PCM WAV for enrollment, verification and voice chat.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the recording state machine, the WAV encoder, and errors
//! - **Application**: Recording session, pipeline, controllers, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, symphonia, rodio, temp files, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
