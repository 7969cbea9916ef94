//! Configuration management for codeglance.
//!
//! Configuration is loaded from a TOML file with defaults for every value.
//! DAM credentials default to `${DAM_URL}` / `${ACCOUNT_KEY}` and are resolved
//! from the environment when the service starts.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for codeglance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DAM connection settings
    pub dam: DamConfig,

    /// Webhook listener settings
    pub server: ServerConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Thumbnail rendering settings
    pub thumbnail: ThumbnailConfig,

    /// Metadata tagging settings
    pub metadata: MetadataConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// DAM endpoint and key after environment resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamCredentials {
    pub url: String,
    pub account_key: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.codeglance.codeglance/config.toml
    /// - Linux: ~/.config/codeglance/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\codeglance\config\config.toml
    ///
    /// Falls back to ~/.codeglance/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "codeglance", "codeglance")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".codeglance").join("config.toml")
            })
    }

    /// Get the custom font path (with ~ expansion).
    pub fn font_path(&self) -> PathBuf {
        let path_str = self.thumbnail.font_path.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Resolve the DAM URL and account key.
    ///
    /// Both are required to run the service; an empty value or an unset
    /// `${VAR}` reference is a fatal startup condition.
    pub fn dam_credentials(&self) -> Result<DamCredentials, ConfigError> {
        let url = resolve_env_var(&self.dam.url).ok_or_else(|| ConfigError::MissingSetting {
            key: "dam.url".into(),
            env: env_name(&self.dam.url, "DAM_URL"),
        })?;
        let account_key =
            resolve_env_var(&self.dam.account_key).ok_or_else(|| ConfigError::MissingSetting {
                key: "dam.account_key".into(),
                env: env_name(&self.dam.account_key, "ACCOUNT_KEY"),
            })?;

        Ok(DamCredentials {
            url: url.trim_end_matches('/').to_string(),
            account_key,
        })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn env_name(value: &str, fallback: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        value[2..value.len() - 1].to_string()
    } else {
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!(config.processing.read_limit_bytes, 500);
        assert_eq!(config.processing.lexer_cache_size, 32);
        assert_eq!(config.thumbnail.size, 240);
        assert_eq!(config.metadata.field_name, "Coding Language");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[dam]"));
        assert!(toml.contains("[thumbnail]"));
        assert!(toml.contains("${DAM_URL}"));
    }

    #[test]
    fn test_load_from_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[processing]\nparallel_workers = 8\n\n[thumbnail]\nsize = 128\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.processing.parallel_workers, 8);
        assert_eq!(config.processing.read_limit_bytes, 500);
        assert_eq!(config.thumbnail.size, 128);
        assert_eq!(config.thumbnail.font_size, 16);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing]\nparallel_workers = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_dam_credentials_literal_values() {
        let mut config = Config::default();
        config.dam.url = "https://dam.example.com/".to_string();
        config.dam.account_key = "secret".to_string();

        let creds = config.dam_credentials().unwrap();
        assert_eq!(creds.url, "https://dam.example.com");
        assert_eq!(creds.account_key, "secret");
    }

    #[test]
    fn test_dam_credentials_missing_env_is_error() {
        let mut config = Config::default();
        config.dam.url = "${CODEGLANCE_TEST_UNSET_URL_XYZ}".to_string();
        config.dam.account_key = "secret".to_string();

        match config.dam_credentials() {
            Err(ConfigError::MissingSetting { key, env }) => {
                assert_eq!(key, "dam.url");
                assert_eq!(env, "CODEGLANCE_TEST_UNSET_URL_XYZ");
            }
            other => panic!("expected MissingSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_dam_credentials_empty_key_is_error() {
        let mut config = Config::default();
        config.dam.url = "https://dam.example.com".to_string();
        config.dam.account_key = String::new();

        let err = config.dam_credentials().unwrap_err();
        assert!(err.to_string().contains("dam.account_key"));
    }

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }
}
