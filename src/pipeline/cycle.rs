use super::ports::{EventSink, StatsSource};
use super::report::{CycleOutcome, CycleReport};
use crate::app::config::SendFailurePolicy;
use crate::domain::{CycleContext, FlatRecord};
use crate::flatten::{EntryScope, FlattenError, flatten_site};
use crate::sender::{EventFormatter, SinkError};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Malformed statistics payload: {0}")]
    Flatten(#[from] FlattenError),
    #[error("Failed to forward event: {0}")]
    Sink(#[from] SinkError),
}

/// Runs one cycle end to end against a statistics source and an event sink.
pub struct CycleRunner<S, K> {
    source: S,
    sink: K,
    formatter: EventFormatter,
    policy: SendFailurePolicy,
}

impl<S: StatsSource, K: EventSink> CycleRunner<S, K> {
    pub fn new(source: S, sink: K, formatter: EventFormatter, policy: SendFailurePolicy) -> Self {
        Self {
            source,
            sink,
            formatter,
            policy,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Fetches, flattens and forwards. Records are sent in entry order, then
    /// site order, then family order.
    ///
    /// Never fails: the outcome and counters are carried in the report.
    pub async fn run(&self, cycle: CycleContext) -> CycleReport {
        info!(
            cycle_id = %cycle.id,
            timestamp_ms = cycle.timestamp_ms(),
            "[{}] Fetching performance data... (Timestamp: {})",
            cycle.started_at,
            cycle.timestamp_ms()
        );

        let mut report = CycleReport::new(cycle);

        let response = match self.source.fetch(&cycle).await {
            Ok(response) => response,
            Err(e) => {
                warn!(cycle_id = %cycle.id, error = %e, "[{}] Skipping cycle, no data", cycle.started_at);
                report.outcome = CycleOutcome::Skipped(e);
                return report;
            }
        };

        for entry in &response.data {
            let scope = match EntryScope::parse(entry) {
                Ok(scope) => scope,
                Err(e) => {
                    report.malformed_entries += 1;
                    if !self.tolerate(&cycle, &mut report, e.into()) {
                        return report;
                    }
                    continue;
                }
            };

            for site in scope.sites() {
                report.sites_seen += 1;
                if !site.has_statistics() {
                    report.sites_skipped += 1;
                    continue;
                }

                for result in flatten_site(scope, site) {
                    if let Err(e) = self.forward(result, &mut report).await {
                        if !self.tolerate(&cycle, &mut report, e) {
                            return report;
                        }
                    }
                }
            }
        }

        if report.failures() == 0 {
            info!(
                cycle_id = %cycle.id,
                sites = report.sites_seen,
                records_sent = report.records_sent,
                "[{}] Done sending to collector successfully.",
                cycle.started_at
            );
        } else {
            warn!(
                cycle_id = %cycle.id,
                sites = report.sites_seen,
                records_sent = report.records_sent,
                records_failed = report.records_failed,
                malformed_records = report.malformed_records,
                malformed_entries = report.malformed_entries,
                "[{}] Done sending to collector with failures.",
                cycle.started_at
            );
        }
        report
    }

    /// Applies the failure policy. Returns `false` when the cycle must stop.
    fn tolerate(&self, cycle: &CycleContext, report: &mut CycleReport, err: CycleError) -> bool {
        if self.policy == SendFailurePolicy::Abort {
            error!(
                cycle_id = %cycle.id,
                records_sent = report.records_sent,
                "[{}] Error occurred: {}",
                cycle.started_at,
                err
            );
            report.outcome = CycleOutcome::Aborted(err);
            return false;
        }
        warn!(cycle_id = %cycle.id, error = %err, "Skipping record");
        true
    }

    async fn forward(
        &self,
        result: Result<FlatRecord, FlattenError>,
        report: &mut CycleReport,
    ) -> Result<(), CycleError> {
        let record = result.inspect_err(|_| report.malformed_records += 1)?;
        let envelope = self.formatter.format(&record);
        match self.sink.send(&envelope).await {
            Ok(_) => {
                report.records_sent += 1;
                Ok(())
            }
            Err(e) => {
                report.records_failed += 1;
                Err(e.into())
            }
        }
    }
}
