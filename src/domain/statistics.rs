use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level payload returned by the performance statistics API.
///
/// Only the envelope is typed. Entries and sites stay raw JSON and are read
/// field by field while flattening, so one malformed site fails its own
/// records instead of the whole body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub data: Vec<TimestampedEntry>,
}

impl MetricsResponse {
    pub fn site_count(&self) -> usize {
        self.data
            .iter()
            .filter_map(TimestampedEntry::sites)
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum()
    }
}

/// One element of `data`: `{timestamp, accountId, sitesStatistics}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TimestampedEntry(Map<String, Value>);

impl TimestampedEntry {
    /// Epoch milliseconds as supplied by the upstream API.
    pub fn timestamp(&self) -> Option<&Value> {
        self.0.get("timestamp")
    }

    pub fn account_id(&self) -> Option<&Value> {
        self.0.get("accountId")
    }

    /// The site list, under `sitesStatistics` or its older `sites` name.
    pub fn sites(&self) -> Option<&Value> {
        self.0.get("sitesStatistics").or_else(|| self.0.get("sites"))
    }
}

/// Borrowed view of one site's statistics block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteStatistics<'a>(&'a Value);

impl<'a> SiteStatistics<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self(raw)
    }

    pub fn site_id(&self) -> Option<&'a Value> {
        self.0.get("siteId")
    }

    pub fn site_name(&self) -> Option<&'a Value> {
        self.0.get("siteName")
    }

    pub fn statistics(&self) -> Option<&'a Value> {
        self.0.get("statistics")
    }

    /// `false` when statistics are absent or empty (`null`, `{}`, `[]`, `""`,
    /// `false`, `0`). Such sites are skipped without reading anything else.
    pub fn has_statistics(&self) -> bool {
        self.statistics().is_some_and(is_truthy)
    }

    pub fn family(&self, name: &str) -> Option<&'a Value> {
        self.statistics().and_then(|stats| stats.get(name))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Human-readable form of an identifier for logs and errors.
pub(crate) fn display_id(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "<unknown>".to_string(),
    }
}
