//! Domain layer for perf-stats-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `MetricsResponse` / `TimestampedEntry` / `SiteStatistics`: the upstream payload
//! - `CycleContext`: identity of one scheduled cycle
//! - `FlatRecord` / `MetricDetail`: the emission unit sent to the collector
//! - `ForwarderError`: Top-level error type

pub mod cycle;
pub mod error;
pub mod record;
pub mod statistics;

pub use cycle::CycleContext;
pub use error::ForwarderError;
pub use record::{FlatRecord, MetricDetail, MetricFamily};
pub use statistics::{MetricsResponse, SiteStatistics, TimestampedEntry};
