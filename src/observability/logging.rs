//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Line-delimited JSON for log collectors.
    Json,
    /// Human-readable output for terminals.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Level filter applied to the fmt layer.
    pub filter: EnvFilter,
    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_settings(None, verbose)
    }

    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `LECTERN_LOG`, `LECTERN_LOG_FORMAT`, and `LECTERN_LOG_FILE` take
    /// precedence over file settings. A malformed filter directive falls
    /// back to the default level rather than failing startup.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = settings
            .and_then(|config| config.format.as_deref())
            .map(LogFormat::parse)
            .unwrap_or_default();
        let format = std::env::var("LECTERN_LOG_FORMAT")
            .ok()
            .map_or(format, |value| LogFormat::parse(&value));

        let file = settings
            .and_then(|config| config.file.as_deref())
            .map(PathBuf::from);
        let file = std::env::var("LECTERN_LOG_FILE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or(file);

        let default_level = if verbose { "debug" } else { "info" };
        let directives = std::env::var("LECTERN_LOG")
            .ok()
            .or_else(|| settings.and_then(|config| config.level.clone()));
        let filter = directives.map_or_else(
            || EnvFilter::new(default_level),
            |directives| {
                EnvFilter::try_new(&directives)
                    .unwrap_or_else(|_| EnvFilter::new(default_level))
            },
        );

        Self {
            format,
            filter,
            file,
        }
    }
}
