//! Typed configuration sections and their defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default bind address for the HTTP surface.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Top-level configuration for the imgmill service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImgmillConfig {
    /// HTTP surface configuration.
    pub http: HttpConfig,
    /// Variant pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl ImgmillConfig {
    /// Validate the assembled configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when any section carries an unusable value.
    pub fn validate(&self) -> ConfigResult<()> {
        self.http.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

impl Default for ImgmillConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Socket address the API binds to.
    pub bind_addr: String,
}

impl HttpConfig {
    /// Parse the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed as a socket address.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr {
                value: self.bind_addr.clone(),
            })
    }

    fn validate(&self) -> ConfigResult<()> {
        self.socket_addr().map(|_| ())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Variant pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory under which per-request working areas are created.
    pub work_root: PathBuf,
    /// Include the full error chain in error response bodies.
    pub expose_error_detail: bool,
}

impl PipelineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.work_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidField {
                section: "pipeline",
                field: "work_root",
                value: None,
                reason: "empty",
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            expose_error_detail: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level string (e.g. `info`, `debug`).
    pub level: String,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormatSetting,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormatSetting::default(),
        }
    }
}

/// Output format for the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable logs.
    #[default]
    Pretty,
}
