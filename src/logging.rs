//! Structured logging setup.
//!
//! Events go to stdout (JSON or pretty) and, when a log directory is configured, to a
//! daily rolling file `app.YYYY-MM-DD` in that directory. Both writers are
//! non-blocking; keep the returned [`LoggingGuard`] alive for the life of the process
//! so buffered lines are flushed on exit.
//!
//! ## Environment Variables
//!
//! - `BRRTK_LOG_LEVEL` - trace/debug/info/warn/error (default `info`); `RUST_LOG` wins when set
//! - `BRRTK_LOG_FORMAT` - `json` or `pretty` (default `pretty`)
//! - `BRRTK_LOG_DIR` - directory of the rolling log file (unset: stdout only)
//! - `BRRTK_LOG_TARGET_FILTER` - extra comma-separated filter directives
//! - `BRRTK_LOG_INCLUDE_LOCATION` - include file:line (default `false`)

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "app";

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Directory of the daily rolling log file
    pub log_dir: Option<PathBuf>,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BRRTK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("BRRTK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            ),
            log_dir: env::var("BRRTK_LOG_DIR").ok().map(PathBuf::from),
            target_filter: env::var("BRRTK_LOG_TARGET_FILTER").ok(),
            include_location: env::var("BRRTK_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Use `dir` for the rolling log file unless one is already configured.
    #[must_use]
    pub fn with_default_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        if self.log_dir.is_none() {
            self.log_dir = dir;
        }
        self
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Ok(directive) = "may_minihttp::http_server=warn".parse() {
            env_filter = env_filter.add_directive(directive);
        }
        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Flush guards of the non-blocking writers.
#[must_use = "dropping the guard stops the background log writers"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize logging from environment variables.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the log directory cannot be
/// created.
pub fn init_logging() -> Result<LoggingGuard> {
    init_logging_with_config(&LogConfig::from_env())
}

/// Initialize logging with an explicit configuration.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the log directory cannot be
/// created.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let mut guards = Vec::with_capacity(2);

    let (stdout, guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(guard);
    let stdout_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(stdout)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(stdout)
            .boxed(),
    };

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_span_list(true)
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _guards: guards })
}
