use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The metric families understood by the flattener, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    ErrorResponseTypes,
    OriginResponseTime,
    PopLatency,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::ErrorResponseTypes,
        MetricFamily::OriginResponseTime,
        MetricFamily::PopLatency,
    ];

    /// Key of the family inside a site's `statistics` object.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricFamily::ErrorResponseTypes => "errorResponseTypes",
            MetricFamily::OriginResponseTime => "originResponseTime",
            MetricFamily::PopLatency => "popLatency",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric observation, flat and ready for the collector.
///
/// Serializes as a single-level JSON object: the common keys followed by
/// `metricName` and the family-specific keys. Every value is carried exactly
/// as the upstream API sent it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub timestamp: Value,
    pub account_id: Value,
    pub site_id: Value,
    pub site_name: Value,
    #[serde(flatten)]
    pub detail: MetricDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "metricName")]
pub enum MetricDetail {
    #[serde(rename = "errorResponseTypes", rename_all = "camelCase")]
    ErrorResponseType { error_type: String, value: Value },
    #[serde(rename = "originResponseTime", rename_all = "camelCase")]
    OriginResponseTime {
        value: Value,
        server: Value,
        data_center_name: Value,
    },
    #[serde(rename = "popLatency")]
    PopLatency { value: Value, region: Value, pop: Value },
}

impl MetricDetail {
    pub fn family(&self) -> MetricFamily {
        match self {
            MetricDetail::ErrorResponseType { .. } => MetricFamily::ErrorResponseTypes,
            MetricDetail::OriginResponseTime { .. } => MetricFamily::OriginResponseTime,
            MetricDetail::PopLatency { .. } => MetricFamily::PopLatency,
        }
    }
}

impl FlatRecord {
    pub fn metric_family(&self) -> MetricFamily {
        self.detail.family()
    }
}
