//! Logging bootstrap for gateway processes
//!
//! Console and optional daily rolling file output share one bracketed format:
//! `2025-12-02T00:50:44.809123Z [INFO] message`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{Error, Result};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used as the log file name prefix
    pub service_name: String,
    /// Filter directive (`info`, `plcreg_protocols=debug`, ...); `RUST_LOG` wins when set
    pub level: String,
    /// Directory for daily rolling files; no file output when absent
    pub log_dir: Option<PathBuf>,
    /// Enable console output
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "plcreg".to_string(),
            level: "info".to_string(),
            log_dir: None,
            console: true,
        }
    }
}

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter producing `timestamp [LEVEL] message`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Resolve the effective filter directive
fn filter_directive(config: &LoggingConfig, rust_log: Option<String>) -> String {
    match rust_log {
        Some(env) if !env.trim().is_empty() => env,
        _ => config.level.clone(),
    }
}

/// Install the global subscriber
///
/// Returns the file appender guard, which must be kept alive for buffered
/// file output to be flushed. Calling this again after a subscriber is
/// installed leaves the existing one in place and returns `Ok(None)`.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(config, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| Error::logging(format!("Invalid log filter '{}': {}", directive, e)))?;

    let console_layer = config.console.then(|| {
        fmt::layer()
            .with_ansi(true)
            .event_format(BracketedLevelFormat)
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(BracketedLevelFormat);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::info!(
                "Logging: {} @ {} ({:?})",
                config.service_name,
                directive,
                config.log_dir
            );
            Ok(guard)
        },
        Err(_) => Ok(None),
    }
}
