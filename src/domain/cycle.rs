use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity of one fetch-and-forward pass, carried on every log line it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleContext {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl CycleContext {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.started_at.timestamp_millis()
    }
}
