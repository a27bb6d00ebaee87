//! Environment-variable configuration loader.
//!
//! Every knob is optional; unset variables fall back to the defaults in
//! [`crate::model`]. Variable names are `IMGMILL_` + the upper-cased field.

use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ImgmillConfig, LogFormatSetting};

/// Prefix shared by all imgmill environment variables.
pub const ENV_PREFIX: &str = "IMGMILL_";

/// Load configuration from the process environment, validating the result.
///
/// # Errors
///
/// Returns an error if any provided value fails to parse or the assembled
/// configuration fails validation.
pub fn load_from_env() -> ConfigResult<ImgmillConfig> {
    load_with(|name| std::env::var(name).ok())
}

fn load_with<F>(lookup: F) -> ConfigResult<ImgmillConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ImgmillConfig::default();

    if let Some(addr) = lookup("IMGMILL_BIND_ADDR") {
        config.http.bind_addr = addr;
    }
    if let Some(root) = lookup("IMGMILL_WORK_ROOT") {
        config.pipeline.work_root = PathBuf::from(root);
    }
    if let Some(flag) = lookup("IMGMILL_EXPOSE_ERROR_DETAIL") {
        config.pipeline.expose_error_detail = parse_bool("expose_error_detail", &flag)?;
    }
    if let Some(level) = lookup("IMGMILL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("IMGMILL_LOG_FORMAT") {
        config.logging.format = parse_format(&format)?;
    }

    config.validate()?;
    Ok(config)
}

fn parse_bool(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidField {
            section: "pipeline",
            field,
            value: Some(value.to_string()),
            reason: "expected_boolean",
        }),
    }
}

fn parse_format(value: &str) -> ConfigResult<LogFormatSetting> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormatSetting::Json),
        "pretty" => Ok(LogFormatSetting::Pretty),
        _ => Err(ConfigError::InvalidField {
            section: "logging",
            field: "format",
            value: Some(value.to_string()),
            reason: "expected_json_or_pretty",
        }),
    }
}
