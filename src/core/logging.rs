//! Logging initialization for the health engine daemon.

use tracing_subscriber::{EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::config::LoggingConfig;
use crate::core::error::{AgentError, Result};

/// Initialize logging based on configuration (or defaults if None).
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<()> {
    let (level, json, file) = match config {
        Some(cfg) => (cfg.level.as_str(), cfg.json, cfg.file.as_ref()),
        None => ("info", false, None),
    };

    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = console_layer(json);

    let init_result = if let Some(file_path) = file {
        let file_layer = file_layer(file_path)?;
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
    };

    init_result.map_err(|e| AgentError::Config(format!("failed to initialize logging: {e}")))?;

    tracing::info!(level, "logging initialized");
    Ok(())
}

fn console_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if json {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .json(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
    }
}

fn file_layer<S>(file_path: &str) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let path = std::path::Path::new(file_path);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| AgentError::Config(format!("invalid log file path: {file_path}")))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    Ok(Box::new(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(file_appender),
    ))
}
