//! Configuration domain types

mod app_config;

pub use app_config::{AppConfig, DEFAULT_DECODE_CONTEXTS, DEFAULT_MAX_UPLOAD_BYTES};
