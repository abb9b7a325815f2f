use crate::domain::FlatRecord;
use serde::Serialize;

pub const DEFAULT_SOURCETYPE: &str = "json_http";
pub const DEFAULT_INDEX: &str = "main";

/// Wire envelope expected by the HTTP event collector.
#[derive(Debug, Clone, Serialize)]
pub struct SinkEnvelope<'a> {
    pub event: &'a FlatRecord,
    pub sourcetype: &'a str,
    pub index: &'a str,
}

/// Wraps flat records into collector envelopes. Field values pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFormatter {
    sourcetype: String,
    index: String,
}

impl EventFormatter {
    pub fn new(sourcetype: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            sourcetype: sourcetype.into(),
            index: index.into(),
        }
    }

    pub fn format<'a>(&'a self, record: &'a FlatRecord) -> SinkEnvelope<'a> {
        SinkEnvelope {
            event: record,
            sourcetype: &self.sourcetype,
            index: &self.index,
        }
    }
}

impl Default for EventFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCETYPE, DEFAULT_INDEX)
    }
}
