//! Configuration management for idcts-portal
//!
//! The only required value is the analysis service base address. Timing knobs for
//! the advisory progress signal have defaults; `config/idcts-portal.toml` is the
//! documented template and is embedded as [`DEFAULT_CONFIG`].

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/idcts-portal.toml";

/// Template configuration shipped with the crate
pub const DEFAULT_CONFIG: &str = include_str!("../config/idcts-portal.toml");

/// Anything faster stops looking like a simulated signal.
pub const MIN_PROGRESS_INTERVAL_MS: u64 = 500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("workflow.progress_interval_ms must be at least 500, got {0}")]
    IntervalTooShort(u64),

    #[error("Invalid progress checkpoints: {0}")]
    InvalidCheckpoints(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Remote analysis service connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub base_address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Timing of the advisory progress signal
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_display_delay_ms")]
    pub display_delay_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("idcts-portal/{}", env!("CARGO_PKG_VERSION"))
}

fn default_progress_interval_ms() -> u64 {
    800
}

fn default_display_delay_ms() -> u64 {
    500
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            display_delay_ms: default_display_delay_ms(),
        }
    }
}

impl WorkflowConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn display_delay(&self) -> Duration {
        Duration::from_millis(self.display_delay_ms)
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PortalConfig {
    /// Build a configuration with defaults for everything but the base address.
    pub fn from_base_address(base_address: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            service: ServiceConfig {
                base_address: base_address.into(),
                request_timeout_secs: default_request_timeout_secs(),
                user_agent: default_user_agent(),
            },
            workflow: WorkflowConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PortalConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.service.base_address.trim();
        if base.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "service.base_address".to_string(),
            });
        }
        match Url::parse(base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidUrl {
                    field: "service.base_address".to_string(),
                    url: self.service.base_address.clone(),
                });
            }
        }
        if self.service.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "service.request_timeout_secs".to_string(),
            });
        }
        if self.service.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "service.user_agent".to_string(),
            });
        }

        if self.workflow.progress_interval_ms < MIN_PROGRESS_INTERVAL_MS {
            return Err(ConfigError::IntervalTooShort(self.workflow.progress_interval_ms));
        }

        Ok(())
    }
}
