use super::cycle::CycleError;
use crate::domain::CycleContext;
use crate::source::FetchError;

#[derive(Debug)]
pub enum CycleOutcome {
    /// Every record was processed (failures may have been skipped under `continue`).
    Completed,
    /// The upstream fetch exhausted its retries; nothing was sent.
    Skipped(FetchError),
    /// The first failure ended the cycle early.
    Aborted(CycleError),
}

#[derive(Debug)]
pub struct CycleReport {
    pub cycle: CycleContext,
    pub sites_seen: usize,
    pub sites_skipped: usize,
    pub records_sent: usize,
    pub records_failed: usize,
    pub malformed_records: usize,
    pub malformed_entries: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub(crate) fn new(cycle: CycleContext) -> Self {
        Self {
            cycle,
            sites_seen: 0,
            sites_skipped: 0,
            records_sent: 0,
            records_failed: 0,
            malformed_records: 0,
            malformed_entries: 0,
            outcome: CycleOutcome::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Completed)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Aborted(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Skipped(_))
    }

    pub fn failures(&self) -> usize {
        self.records_failed + self.malformed_records + self.malformed_entries
    }
}
