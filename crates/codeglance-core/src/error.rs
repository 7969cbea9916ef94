//! Error types for the codeglance preview pipeline.
//!
//! Errors are organized by stage so that the worker boundary can log a single
//! line that names the file, the stage, and the specific issue.

use thiserror::Error;

/// Top-level error type for codeglance operations.
#[derive(Error, Debug)]
pub enum GlanceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A required setting is empty or references an unset environment variable
    #[error("Missing required setting {key} (set it in the config file or via ${env})")]
    MissingSetting { key: String, env: String },
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Network or HTTP failure talking to the DAM
    #[error("{operation} failed for {path}: {message}")]
    Transport {
        operation: &'static str,
        path: String,
        message: String,
        status_code: Option<u16>,
    },

    /// No grammar matches the file name
    #[error("No lexer found for {path}")]
    UnsupportedFile { path: String },

    /// Rendering or image encoding failed
    #[error("Render failed for {path}: {message}")]
    Render { path: String, message: String },

    /// Metadata field lookup or creation failed
    #[error("Metadata field '{field}' could not be provisioned: {message}")]
    MetadataProvision { field: String, message: String },

    /// Local temporary storage failed
    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// HTTP status code for transport failures that got a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::Transport { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Errors reported back to the webhook caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    /// Body missing, empty, not JSON, or an empty JSON value
    #[error("No JSON data in request")]
    NoJsonData,
}

/// Convenience type alias for codeglance results.
pub type Result<T> = std::result::Result<T, GlanceError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message_names_operation_and_path() {
        let err = PipelineError::Transport {
            operation: "download",
            path: "//depot/a.py".to_string(),
            message: "HTTP 404".to_string(),
            status_code: Some(404),
        };
        assert_eq!(err.to_string(), "download failed for //depot/a.py: HTTP 404");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_missing_setting_mentions_env_var() {
        let err = ConfigError::MissingSetting {
            key: "dam.url".to_string(),
            env: "DAM_URL".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dam.url"));
        assert!(msg.contains("$DAM_URL"));
    }

    #[test]
    fn test_ingest_error_message_is_stable() {
        assert_eq!(IngestError::NoJsonData.to_string(), "No JSON data in request");
    }

    #[test]
    fn test_render_error_has_no_status() {
        let err = PipelineError::Render {
            path: "a.py".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.status_code(), None);
    }
}
