//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// VoiceCapture - microphone capture and canonical WAV encoding
#[derive(Parser, Debug)]
#[command(name = "voice-capture")]
#[command(version)]
#[command(about = "Record voice samples from the microphone and encode them as 16-bit PCM WAV")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory finished recordings are written to
    #[arg(short = 'o', long, value_name = "DIR", global = true)]
    pub output: Option<PathBuf>,

    /// Play the finished recording back before exiting
    #[arg(short = 'p', long, global = true)]
    pub preview: bool,

    /// Print recording metadata as JSON instead of the file path
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record an enrollment sample (Enter stops, 'c' cancels)
    Enroll {
        /// Shortest acceptable sample (e.g., 5s, 10s)
        #[arg(long, value_name = "TIME")]
        min_duration: Option<String>,
    },
    /// Record a verification sample; stops automatically at the ceiling
    Verify {
        /// Auto-stop ceiling (e.g., 5s)
        #[arg(long, value_name = "TIME")]
        max_duration: Option<String>,
    },
    /// Push-to-talk chat message: recording starts at once, Enter sends, 'c' discards
    Talk {
        /// Auto-stop ceiling (e.g., 60s, 1m)
        #[arg(long, value_name = "TIME")]
        max_duration: Option<String>,
    },
    /// Convert an audio file to canonical WAV
    Convert(ConvertArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `convert`
#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Input audio file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Declared content type (guessed from the extension when omitted)
    #[arg(long, value_name = "MIME")]
    pub content_type: Option<String>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// How finished recordings are reported
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    pub preview: bool,
    pub json: bool,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "output_dir",
    "enroll_min_duration",
    "verify_max_duration",
    "chat_max_duration",
    "acquire_timeout",
    "decode_contexts",
    "max_upload_bytes",
    "preview",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
