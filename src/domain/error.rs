use thiserror::Error;

/// Top-level error type for the forwarder.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::app::LoggingError),

    #[error("Source client error: {0}")]
    Source(#[from] crate::source::FetchError),

    #[error("Sink client error: {0}")]
    Sink(#[from] crate::sender::SinkError),
}
