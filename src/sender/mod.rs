pub mod envelope;
pub mod http;

pub use envelope::{DEFAULT_INDEX, DEFAULT_SOURCETYPE, EventFormatter, SinkEnvelope};
pub use http::{SinkConfig, SinkError, SinkForwarder, SinkResponse, SinkStats, SinkStatsSnapshot};
