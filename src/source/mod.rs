pub mod client;

pub use client::{FetchError, SourceConfig, StatsClient};
