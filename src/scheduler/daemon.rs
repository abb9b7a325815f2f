use super::cadence::{Clock, MinuteCadence, SystemClock};
use crate::domain::CycleContext;
use crate::pipeline::{CycleOutcome, CycleReport, CycleRunner, EventSink, StatsSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters kept by the scheduler over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub ticks: u64,
    pub ticks_skipped: u64,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_aborted: u64,
    pub cycles_panicked: u64,
    pub cycles_cancelled: u64,
}

/// Triggers one cycle per minute boundary, each on its own tracked task.
///
/// Cycles may overlap. When `max_in_flight` is set and every slot is busy,
/// the tick is dropped instead of queued.
pub struct CycleScheduler<S, K, C = SystemClock> {
    runner: Arc<CycleRunner<S, K>>,
    clock: C,
    cadence: MinuteCadence,
    in_flight: Option<Arc<Semaphore>>,
    shutdown_grace: Duration,
}

impl<S: StatsSource, K: EventSink> CycleScheduler<S, K, SystemClock> {
    pub fn new(runner: Arc<CycleRunner<S, K>>) -> Self {
        Self::with_clock(runner, SystemClock)
    }
}

impl<S: StatsSource, K: EventSink, C: Clock> CycleScheduler<S, K, C> {
    pub fn with_clock(runner: Arc<CycleRunner<S, K>>, clock: C) -> Self {
        Self {
            runner,
            clock,
            cadence: MinuteCadence,
            in_flight: None,
            shutdown_grace: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.in_flight = limit.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Runs until `shutdown` is cancelled, then waits up to the grace period
    /// for in-flight cycles before aborting them.
    pub async fn run(self, shutdown: CancellationToken) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();
        let mut tasks: JoinSet<CycleReport> = JoinSet::new();

        info!(
            max_in_flight = ?self.in_flight.as_ref().map(|s| s.available_permits()),
            "Scheduler started, cycles run at every minute boundary"
        );

        loop {
            let now = self.clock.now();
            let wait = self.cadence.duration_until_next_tick(now);
            debug!(
                next_tick = %self.cadence.next_tick_from(now),
                wait_ms = wait.as_millis() as u64,
                in_flight = tasks.len(),
                "Waiting for next minute boundary"
            );

            let tick = sleep(wait);
            tokio::pin!(tick);

            // Reap finished cycles while waiting, without moving the deadline.
            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => {
                        self.drain(tasks, &mut summary).await;
                        info!(?summary, "Scheduler stopped");
                        return summary;
                    }
                    () = &mut tick => break,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        Self::observe(joined, &mut summary);
                    }
                }
            }

            summary.ticks += 1;
            self.dispatch(&mut tasks, &mut summary);
        }
    }

    fn dispatch(&self, tasks: &mut JoinSet<CycleReport>, summary: &mut SchedulerSummary) {
        let permit = match &self.in_flight {
            Some(semaphore) => {
                if let Ok(permit) = semaphore.clone().try_acquire_owned() {
                    Some(permit)
                } else {
                    summary.ticks_skipped += 1;
                    warn!(
                        in_flight = tasks.len(),
                        "Skipping tick, maximum number of cycles already in flight"
                    );
                    return;
                }
            }
            None => None,
        };

        let cycle = CycleContext::new(self.clock.now());
        let runner = self.runner.clone();
        tasks.spawn(async move {
            let _permit = permit;
            runner.run(cycle).await
        });
    }

    fn observe(joined: Result<CycleReport, JoinError>, summary: &mut SchedulerSummary) {
        match joined {
            Ok(report) => match report.outcome {
                CycleOutcome::Completed => summary.cycles_completed += 1,
                CycleOutcome::Skipped(_) => summary.cycles_skipped += 1,
                CycleOutcome::Aborted(_) => summary.cycles_aborted += 1,
            },
            Err(e) if e.is_panic() => {
                summary.cycles_panicked += 1;
                error!(error = %e, "Cycle task panicked");
            }
            Err(e) => {
                summary.cycles_cancelled += 1;
                debug!(error = %e, "Cycle task cancelled");
            }
        }
    }

    async fn drain(&self, mut tasks: JoinSet<CycleReport>, summary: &mut SchedulerSummary) {
        if tasks.is_empty() {
            return;
        }

        info!(
            in_flight = tasks.len(),
            grace_secs = self.shutdown_grace.as_secs(),
            "Waiting for in-flight cycles to finish"
        );

        let deadline = sleep(self.shutdown_grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => Self::observe(joined, summary),
                    None => return,
                },
                () = &mut deadline => break,
            }
        }

        warn!(
            remaining = tasks.len(),
            "Shutdown grace period elapsed, aborting in-flight cycles"
        );
        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            Self::observe(joined, summary);
        }
    }
}
