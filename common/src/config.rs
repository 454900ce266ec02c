use serde::{Deserialize, Serialize};
use slide_protocol::{check_slide_count, GenerationRequest, Tone, DEFAULT_SLIDES};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const ENV_BASE_URL: &str = "SLIDE_API_BASE_URL";
pub const ENV_DOWNLOAD_DIR: &str = "SLIDE_DOWNLOAD_DIR";
pub const ENV_LOG_PATH: &str = "SLIDE_LOG_PATH";

const CONFIG_FILE_NAMES: [&str; 2] = ["config.toml", "config.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Base URL of the deck service; operation paths are appended to it.
    pub base_url: String,
    /// Overall request timeout. Unset means the HTTP client's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Where exported files are saved.
    pub download_dir: PathBuf,
    pub default_tone: Tone,
    pub default_slide_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            download_dir: PathBuf::from("downloads"),
            default_tone: Tone::default(),
            default_slide_count: DEFAULT_SLIDES,
            log_path: None,
        }
    }
}

impl SlideConfig {
    /// Per-user config directory, e.g. `~/.config/slide`.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("slide"))
    }

    /// Load configuration from a JSON or TOML file, chosen by extension.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let config: SlideConfig = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: display,
                reason: e.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: display,
                reason: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// First config file found in `dir`, or defaults when there is none.
    pub fn discover_in(dir: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                tracing::info!("Loaded configuration from {}", candidate.display());
                return Self::load_from_file(candidate);
            }
        }
        tracing::debug!("No config file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    /// Explicit file if given, else the per-user config dir, then environment
    /// overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match (explicit, Self::config_dir()) {
            (Some(path), _) => Self::load_from_file(path)?,
            (None, Some(dir)) => Self::discover_in(&dir)?,
            (None, None) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(dir) = non_empty(ENV_DOWNLOAD_DIR) {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty(ENV_LOG_PATH) {
            self.log_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
            });
        }
        check_slide_count(i64::from(self.default_slide_count)).map_err(|_| {
            ConfigError::InvalidValue {
                field: "default_slide_count".to_string(),
                value: self.default_slide_count.to_string(),
            }
        })?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("slide.log"))
    }

    /// Empty form pre-filled with the configured tone and slide count.
    pub fn blank_request(&self) -> GenerationRequest {
        GenerationRequest {
            tone: self.default_tone,
            slide_count: self.default_slide_count,
            ..GenerationRequest::default()
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
                path: display.clone(),
                reason: e.to_string(),
            })?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
                path: display.clone(),
                reason: e.to_string(),
            })?
        };
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: display,
            source,
        })
    }
}
