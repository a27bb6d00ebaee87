//! Application bootstrap: configuration loading, telemetry installation, and
//! server wiring.

use imgmill_api::ApiServer;
use imgmill_config::{ImgmillConfig, LogFormatSetting, load_from_env};
use imgmill_events::EventBus;
use imgmill_telemetry::{LogFormat, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Entry point for the imgmill application boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, telemetry, or server startup fails.
pub async fn run_app() -> AppResult<()> {
    let config = load_from_env().map_err(|err| AppError::config("config.load", err))?;
    run_app_with(config).await
}

/// Boot sequence that relies entirely on an injected configuration to
/// simplify testing.
pub(crate) async fn run_app_with(config: ImgmillConfig) -> AppResult<()> {
    let logging = LoggingConfig {
        level: &config.logging.level,
        format: match config.logging.format {
            LogFormatSetting::Json => LogFormat::Json,
            LogFormatSetting::Pretty => LogFormat::Pretty,
        },
        build_sha: option_env!("BUILD_SHA").unwrap_or("dev"),
    };
    imgmill_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("imgmill application bootstrap starting");

    let addr = config
        .http
        .socket_addr()
        .map_err(|err| AppError::config("config.bind_addr", err))?;
    let events = EventBus::new();
    let telemetry = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let server = ApiServer::new(&config, events, telemetry);
    info!(bind_addr = %addr, work_root = %config.pipeline.work_root.display(), "imgmill ready");
    server
        .serve(addr)
        .await
        .map_err(|err| AppError::api_server("api.serve", err))
}
