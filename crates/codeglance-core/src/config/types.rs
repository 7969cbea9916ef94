//! Sub-configuration structs with service defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// DAM connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamConfig {
    /// Base URL of the DAM, or `${ENV_VAR}` to read it from the environment
    pub url: String,

    /// Account key used to authenticate, or `${ENV_VAR}`
    pub account_key: String,

    /// HTTP client timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DamConfig {
    fn default() -> Self {
        Self {
            url: "${DAM_URL}".to_string(),
            account_key: "${ACCOUNT_KEY}".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Webhook listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of concurrent workers
    pub parallel_workers: usize,

    /// How many leading bytes of each file are decoded for the preview
    pub read_limit_bytes: usize,

    /// Number of filename -> lexer resolutions kept in memory
    pub lexer_cache_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            read_limit_bytes: 500,
            lexer_cache_size: 32,
        }
    }
}

/// Thumbnail rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Output edge length in pixels (thumbnails are square)
    pub size: u32,

    /// Font size in pixels
    pub font_size: u32,

    /// Optional TrueType/OpenType font; the built-in bitmap font is used if missing
    pub font_path: PathBuf,

    /// Padding around the rendered text
    pub image_pad: u32,

    /// Extra spacing between lines
    pub line_pad: u32,

    /// Canvas width as a multiple of `size`, wide enough that lines are not cut early
    pub canvas_scale: u32,

    /// syntect theme name
    pub theme: String,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 240,
            font_size: 16,
            font_path: PathBuf::from("font/custom_font.ttf"),
            image_pad: 10,
            line_pad: 5,
            canvas_scale: 2,
            theme: "InspiredGitHub".to_string(),
        }
    }
}

/// DAM metadata settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Name of the free-text field that receives the detected language
    pub field_name: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            field_name: "Coding Language".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
