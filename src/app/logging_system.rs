use super::config::{LogFormat, LogLevel};
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to set global tracing subscriber: {0}")]
    InitFailed(#[from] tracing_subscriber::util::TryInitError),
}

/// A `target=level` pair fed into the env filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogDirective {
    pub target: &'static str,
    pub level: LogLevel,
}

impl LogDirective {
    pub const fn new(target: &'static str, level: LogLevel) -> Self {
        Self { target, level }
    }

    pub fn to_filter_string(self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// HTTP stack crates are noisy at debug level.
const DEFAULT_DIRECTIVES: &[LogDirective] = &[
    LogDirective::new("hyper", LogLevel::Warn),
    LogDirective::new("hyper_util", LogLevel::Warn),
    LogDirective::new("reqwest", LogLevel::Warn),
    LogDirective::new("h2", LogLevel::Warn),
    LogDirective::new("rustls", LogLevel::Warn),
    LogDirective::new("tower", LogLevel::Warn),
];

pub struct LoggingSystem {
    directives: Vec<LogDirective>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: DEFAULT_DIRECTIVES.to_vec(),
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let mut filter_parts = Vec::with_capacity(self.directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(self.directives.iter().map(|d| d.to_filter_string()));
        filter_parts.join(",")
    }

    /// `RUST_LOG` wins over the configured level when it is set and valid.
    pub fn env_filter(&self, default_level: LogLevel) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let filter = self.build_filter_string(default_level);
        EnvFilter::try_new(&filter).map_err(|source| LoggingError::InvalidFilter { filter, source })
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), LoggingError> {
        let env_filter = self.env_filter(default_level)?;

        match format {
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true)
                        .compact(),
                )
                .try_init()?,
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false)
                        .flatten_event(true),
                )
                .try_init()?,
        }

        Ok(())
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber once; later calls are no-ops.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    static INIT: OnceLock<()> = OnceLock::new();

    if INIT.get().is_some() {
        return Ok(());
    }
    LoggingSystem::new().initialize_tracing(level, format)?;
    let _ = INIT.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_string_starts_with_default_level() {
        let system = LoggingSystem::new();
        let filter = system.build_filter_string(LogLevel::Debug);

        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn built_filter_is_accepted_by_env_filter() {
        let filter = LoggingSystem::new().build_filter_string(LogLevel::Warn);
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}
