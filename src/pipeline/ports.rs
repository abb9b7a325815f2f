use crate::domain::{CycleContext, MetricsResponse};
use crate::sender::{SinkEnvelope, SinkError, SinkForwarder, SinkResponse};
use crate::source::{FetchError, StatsClient};
use std::future::Future;

/// Where a cycle gets its statistics from.
pub trait StatsSource: Send + Sync + 'static {
    fn fetch(
        &self,
        cycle: &CycleContext,
    ) -> impl Future<Output = Result<MetricsResponse, FetchError>> + Send;
}

/// Where a cycle delivers formatted events.
pub trait EventSink: Send + Sync + 'static {
    fn send(
        &self,
        envelope: &SinkEnvelope<'_>,
    ) -> impl Future<Output = Result<SinkResponse, SinkError>> + Send;
}

impl StatsSource for StatsClient {
    async fn fetch(&self, cycle: &CycleContext) -> Result<MetricsResponse, FetchError> {
        StatsClient::fetch(self, cycle).await
    }
}

impl EventSink for SinkForwarder {
    async fn send(&self, envelope: &SinkEnvelope<'_>) -> Result<SinkResponse, SinkError> {
        SinkForwarder::send(self, envelope).await
    }
}
