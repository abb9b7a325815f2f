pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel, SendFailurePolicy};
pub use logging_system::{LoggingError, setup_logging};

use crate::domain::ForwarderError;
use crate::pipeline::CycleRunner;
use crate::scheduler::{CycleScheduler, SchedulerSummary};
use crate::sender::{EventFormatter, SinkConfig, SinkForwarder};
use crate::source::{SourceConfig, StatsClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

type ForwarderScheduler = CycleScheduler<StatsClient, SinkForwarder>;

/// The assembled forwarder: one scheduler driving fetch, flatten and send.
pub struct App {
    config: Arc<Config>,
    runner: Arc<CycleRunner<StatsClient, SinkForwarder>>,
    scheduler: ForwarderScheduler,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, ForwarderError> {
        let config = Arc::new(config);

        let source = StatsClient::new(SourceConfig {
            base_url: config.api_base_url.clone(),
            api_id: config.api_id.clone(),
            api_key: config.api_key.clone(),
            site_ids: config.site_ids.clone(),
            verify_tls: config.api_verify_tls,
            timeout: config.request_timeout,
            connection_timeout: config.connect_timeout,
            retry: config.retry,
            ..SourceConfig::default()
        })?;

        let sink = SinkForwarder::new(SinkConfig {
            endpoint: config.sink_url.clone(),
            token: config.sink_token.clone(),
            auth_scheme: config.sink_auth_scheme.clone(),
            verify_tls: config.sink_verify_tls,
            timeout: config.request_timeout,
            connection_timeout: config.connect_timeout,
            verbose: config.verbose,
            ..SinkConfig::default()
        })?;

        let formatter = EventFormatter::new(&*config.sink_sourcetype, &*config.sink_index);
        let runner = Arc::new(CycleRunner::new(
            source,
            sink,
            formatter,
            config.send_failure_policy,
        ));
        let scheduler = CycleScheduler::new(Arc::clone(&runner))
            .max_in_flight(config.max_in_flight_cycles)
            .shutdown_grace(config.shutdown_grace);

        info!(
            api = %config.api_base_url,
            sites = config.site_ids.len(),
            sink = %config.sink_url,
            sink_verify_tls = config.sink_verify_tls,
            retry_count = config.retry_count,
            retry_delay_secs = config.retry_delay_secs,
            policy = ?config.send_failure_policy,
            max_in_flight = ?config.max_in_flight_cycles,
            "Forwarder configured"
        );

        Ok(Self {
            config,
            runner,
            scheduler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> SchedulerSummary {
        let shutdown = CancellationToken::new();
        let listener = shutdown::spawn_signal_listener(shutdown.clone());
        let summary = self.run_until(shutdown).await;
        listener.abort();
        summary
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run_until(self, shutdown: CancellationToken) -> SchedulerSummary {
        info!(version = crate::VERSION, "Starting performance statistics forwarder");

        let summary = self.scheduler.run(shutdown).await;
        let sink_stats = self.runner.sink().stats();

        info!(
            ticks = summary.ticks,
            completed = summary.cycles_completed,
            skipped = summary.cycles_skipped,
            aborted = summary.cycles_aborted,
            sent = sink_stats.successful_requests,
            failed = sink_stats.failed_requests,
            "Forwarder stopped"
        );
        summary
    }
}

pub async fn main() -> anyhow::Result<()> {
    let config = match Config::load(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    setup_logging(config.log_level, config.log_format)?;

    let app = App::from_config(config)?;
    app.run().await;
    Ok(())
}
