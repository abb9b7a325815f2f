use super::envelope::SinkEnvelope;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, ClientBuilder, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Collector returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub endpoint: String,
    pub token: String,
    pub auth_scheme: String,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
    pub verbose: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:8088/services/collector/event".to_string(),
            token: String::new(),
            auth_scheme: "Splunk".to_string(),
            verify_tls: false,
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("perf-stats-forwarder/{}", env!("CARGO_PKG_VERSION")),
            verbose: false,
        }
    }
}

/// What the collector answered for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct SinkStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

impl SinkStats {
    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_ms
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> SinkStatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time_ms.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        SinkStatsSnapshot {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

/// Posts one envelope per request to the collector. No batching, no retry.
#[derive(Debug, Clone)]
pub struct SinkForwarder {
    client: Client,
    endpoint: Url,
    authorization: HeaderValue,
    verbose: bool,
    stats: Arc<SinkStats>,
}

impl SinkForwarder {
    pub fn new(config: SinkConfig) -> Result<Self, SinkError> {
        let endpoint: Url = config.endpoint.parse().map_err(|e| {
            SinkError::InvalidConfiguration(format!("Invalid sink URL '{}': {e}", config.endpoint))
        })?;

        let mut authorization =
            HeaderValue::from_str(&format!("{} {}", config.auth_scheme, config.token)).map_err(
                |_| SinkError::InvalidConfiguration("Sink token is not a valid header value".to_string()),
            )?;
        authorization.set_sensitive(true);

        if !config.verify_tls {
            warn!(endpoint = %endpoint, "TLS certificate verification disabled for collector");
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                SinkError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint,
            authorization,
            verbose: config.verbose,
            stats: Arc::new(SinkStats::default()),
        })
    }

    pub fn stats(&self) -> SinkStatsSnapshot {
        self.stats.snapshot()
    }

    /// Sends one envelope and waits for the collector's answer.
    ///
    /// The status line is logged before a non-2xx answer is turned into
    /// `SinkError::Status`.
    pub async fn send(&self, envelope: &SinkEnvelope<'_>) -> Result<SinkResponse, SinkError> {
        if self.verbose {
            info!(
                "Sending to collector: {}",
                serde_json::to_string_pretty(envelope)?
            );
        }

        let start = Instant::now();
        let response = match self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .json(envelope)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, start.elapsed());
                return Err(SinkError::Network(e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "Failed to read collector response body");
                String::new()
            }
        };
        self.stats.record_request(status.is_success(), start.elapsed());

        if self.verbose {
            debug!(status = status.as_u16(), "Collector responded");
        } else {
            info!(
                timestamp = %envelope.event.timestamp,
                status = status.as_u16(),
                "{} - Response from collector: {} - {}",
                envelope.event.timestamp,
                status.as_u16(),
                body
            );
        }

        if status.is_success() {
            Ok(SinkResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(SinkError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
