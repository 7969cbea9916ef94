//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const MAX_THUMBNAIL_SIZE: u32 = 4096;
const MAX_CANVAS_SCALE: u32 = 8;
const MAX_FONT_SIZE: u32 = 256;
const MAX_PADDING: u32 = 256;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.read_limit_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "processing.read_limit_bytes must be > 0".into(),
            ));
        }
        if self.processing.lexer_cache_size == 0 {
            return Err(ConfigError::ValidationError(
                "processing.lexer_cache_size must be > 0".into(),
            ));
        }
        if self.thumbnail.size == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.size must be > 0".into(),
            ));
        }
        if self.thumbnail.font_size == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.font_size must be > 0".into(),
            ));
        }
        if self.thumbnail.canvas_scale == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.canvas_scale must be > 0".into(),
            ));
        }
        if self.thumbnail.size > MAX_THUMBNAIL_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "thumbnail.size must be <= {MAX_THUMBNAIL_SIZE}"
            )));
        }
        if self.thumbnail.canvas_scale > MAX_CANVAS_SCALE {
            return Err(ConfigError::ValidationError(format!(
                "thumbnail.canvas_scale must be <= {MAX_CANVAS_SCALE}"
            )));
        }
        if self.thumbnail.font_size > MAX_FONT_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "thumbnail.font_size must be <= {MAX_FONT_SIZE}"
            )));
        }
        if self.thumbnail.line_pad > MAX_PADDING || self.thumbnail.image_pad > MAX_PADDING {
            return Err(ConfigError::ValidationError(format!(
                "thumbnail.line_pad and thumbnail.image_pad must be <= {MAX_PADDING}"
            )));
        }
        if self.dam.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dam.timeout_secs must be > 0".into(),
            ));
        }
        if self.metadata.field_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "metadata.field_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_thumbnail_size() {
        let mut config = Config::default();
        config.thumbnail.size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thumbnail.size"));
    }

    #[test]
    fn test_validate_rejects_zero_cache() {
        let mut config = Config::default();
        config.processing.lexer_cache_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lexer_cache_size"));
    }

    #[test]
    fn test_validate_rejects_blank_field_name() {
        let mut config = Config::default();
        config.metadata.field_name = "   ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("field_name"));
    }

    #[test]
    fn test_validate_caps_canvas_dimensions() {
        let mut config = Config::default();
        config.thumbnail.size = 100_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thumbnail.size must be <= 4096"));

        let mut config = Config::default();
        config.thumbnail.canvas_scale = 9;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thumbnail.size = 4096;
        config.thumbnail.canvas_scale = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_caps_font_and_padding() {
        let mut config = Config::default();
        config.thumbnail.font_size = 1000;
        assert!(config.validate().unwrap_err().to_string().contains("font_size"));

        let mut config = Config::default();
        config.thumbnail.line_pad = 10_000;
        assert!(config.validate().unwrap_err().to_string().contains("line_pad"));
    }
}
