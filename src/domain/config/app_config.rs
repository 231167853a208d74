//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::recording::Duration;

/// Decode contexts that may be open at once
pub const DEFAULT_DECODE_CONTEXTS: usize = 4;

/// Largest accepted upload (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub output_dir: Option<String>,
    pub enroll_min_duration: Option<String>,
    pub verify_max_duration: Option<String>,
    pub chat_max_duration: Option<String>,
    pub acquire_timeout: Option<String>,
    pub decode_contexts: Option<usize>,
    pub max_upload_bytes: Option<u64>,
    pub preview: Option<bool>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            output_dir: Some(".".to_string()),
            enroll_min_duration: Some(Duration::default_enroll_min().to_string()),
            verify_max_duration: Some(Duration::default_verify_max().to_string()),
            chat_max_duration: Some(Duration::default_chat_max().to_string()),
            acquire_timeout: Some(Duration::default_acquire_timeout().to_string()),
            decode_contexts: Some(DEFAULT_DECODE_CONTEXTS),
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
            preview: Some(false),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            output_dir: other.output_dir.or(self.output_dir),
            enroll_min_duration: other.enroll_min_duration.or(self.enroll_min_duration),
            verify_max_duration: other.verify_max_duration.or(self.verify_max_duration),
            chat_max_duration: other.chat_max_duration.or(self.chat_max_duration),
            acquire_timeout: other.acquire_timeout.or(self.acquire_timeout),
            decode_contexts: other.decode_contexts.or(self.decode_contexts),
            max_upload_bytes: other.max_upload_bytes.or(self.max_upload_bytes),
            preview: other.preview.or(self.preview),
        }
    }

    fn parse_duration(value: Option<&String>, default: Duration) -> Duration {
        value.and_then(|s| s.parse().ok()).unwrap_or(default)
    }

    pub fn output_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or("."))
    }

    pub fn enroll_min_duration_or_default(&self) -> Duration {
        Self::parse_duration(
            self.enroll_min_duration.as_ref(),
            Duration::default_enroll_min(),
        )
    }

    pub fn verify_max_duration_or_default(&self) -> Duration {
        Self::parse_duration(
            self.verify_max_duration.as_ref(),
            Duration::default_verify_max(),
        )
    }

    pub fn chat_max_duration_or_default(&self) -> Duration {
        Self::parse_duration(self.chat_max_duration.as_ref(), Duration::default_chat_max())
    }

    pub fn acquire_timeout_or_default(&self) -> Duration {
        Self::parse_duration(
            self.acquire_timeout.as_ref(),
            Duration::default_acquire_timeout(),
        )
    }

    /// At least one decode context is always available
    pub fn decode_contexts_or_default(&self) -> usize {
        self.decode_contexts
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_DECODE_CONTEXTS)
    }

    pub fn max_upload_bytes_or_default(&self) -> u64 {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn preview_or_default(&self) -> bool {
        self.preview.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.output_dir, Some(".".to_string()));
        assert_eq!(config.enroll_min_duration, Some("5s".to_string()));
        assert_eq!(config.verify_max_duration, Some("5s".to_string()));
        assert_eq!(config.chat_max_duration, Some("1m".to_string()));
        assert_eq!(config.acquire_timeout, Some("30s".to_string()));
        assert_eq!(config.decode_contexts, Some(4));
        assert_eq!(config.max_upload_bytes, Some(10 * 1024 * 1024));
        assert_eq!(config.preview, Some(false));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.output_dir.is_none());
        assert!(config.verify_max_duration.is_none());
        assert!(config.decode_contexts.is_none());
        assert!(config.preview.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            output_dir: Some("/base".to_string()),
            verify_max_duration: Some("5s".to_string()),
            ..Default::default()
        };
        let other = AppConfig {
            output_dir: Some("/other".to_string()),
            verify_max_duration: None,
            preview: Some(true),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.output_dir, Some("/other".to_string()));
        assert_eq!(merged.verify_max_duration, Some("5s".to_string()));
        assert_eq!(merged.preview, Some(true));
    }

    #[test]
    fn durations_parse_or_fall_back() {
        let config = AppConfig {
            chat_max_duration: Some("30s".to_string()),
            verify_max_duration: Some("invalid".to_string()),
            ..Default::default()
        };
        assert_eq!(config.chat_max_duration_or_default().as_secs(), 30);
        assert_eq!(config.verify_max_duration_or_default().as_secs(), 5);
        assert_eq!(config.enroll_min_duration_or_default().as_secs(), 5);
        assert_eq!(config.acquire_timeout_or_default().as_secs(), 30);
    }

    #[test]
    fn zero_decode_contexts_falls_back() {
        let config = AppConfig {
            decode_contexts: Some(0),
            ..Default::default()
        };
        assert_eq!(config.decode_contexts_or_default(), DEFAULT_DECODE_CONTEXTS);
    }

    #[test]
    fn scalar_defaults() {
        let config = AppConfig::empty();
        assert_eq!(config.output_dir_or_default(), PathBuf::from("."));
        assert_eq!(config.max_upload_bytes_or_default(), DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!config.preview_or_default());
    }
}
