use crate::domain::{CycleContext, MetricsResponse};
use crate::reliability::RetryPolicy;
use reqwest::header::HeaderValue;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const API_ID_HEADER: &str = "x-API-Id";
pub const API_KEY_HEADER: &str = "x-API-Key";
pub const SITE_IDS_PARAM: &str = "siteIds";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Failed to fetch performance statistics after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_id: String,
    pub api_key: String,
    pub site_ids: Vec<String>,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.imperva.com/appdlv-dashboards-ui/v3/performance/statistics"
                .to_string(),
            api_id: String::new(),
            api_key: String::new(),
            site_ids: Vec::new(),
            verify_tls: true,
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("perf-stats-forwarder/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
        }
    }
}

/// Client for the upstream performance statistics API.
#[derive(Debug, Clone)]
pub struct StatsClient {
    client: Client,
    request_url: Url,
    api_id: HeaderValue,
    api_key: HeaderValue,
    retry: RetryPolicy,
}

impl StatsClient {
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let mut request_url: Url = config.base_url.parse().map_err(|e| {
            FetchError::InvalidConfiguration(format!(
                "Invalid statistics API URL '{}': {e}",
                config.base_url
            ))
        })?;
        request_url
            .query_pairs_mut()
            .append_pair(SITE_IDS_PARAM, &config.site_ids.join(","));

        let api_id = HeaderValue::from_str(&config.api_id).map_err(|_| {
            FetchError::InvalidConfiguration("API id is not a valid header value".to_string())
        })?;
        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            FetchError::InvalidConfiguration("API key is not a valid header value".to_string())
        })?;
        api_key.set_sensitive(true);

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                FetchError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            request_url,
            api_id,
            api_key,
            retry: config.retry,
        })
    }

    pub fn request_url(&self) -> &Url {
        &self.request_url
    }

    /// Fetches the statistics payload, retrying with a fixed delay.
    ///
    /// Exhausting the retry budget returns `FetchError::RetriesExhausted`;
    /// callers skip the cycle rather than treat it as fatal.
    pub async fn fetch(&self, cycle: &CycleContext) -> Result<MetricsResponse, FetchError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 1;

        loop {
            let err = match self.fetch_once().await {
                Ok(response) => {
                    debug!(
                        cycle_id = %cycle.id,
                        attempt,
                        entries = response.data.len(),
                        sites = response.site_count(),
                        "Fetched performance statistics"
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            let reason = match &err {
                FetchError::Status { .. } => "Error fetching data",
                FetchError::Network(_) => "Network error",
                FetchError::Decode(_) => "Malformed response body",
                _ => "Fetch failed",
            };
            warn!(
                cycle_id = %cycle.id,
                attempt,
                max_attempts,
                "[{}:Attempt {}/{}] {}: {}",
                cycle.started_at,
                attempt,
                max_attempts,
                reason,
                err
            );

            match self.retry.delay_after(attempt) {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!(
                        cycle_id = %cycle.id,
                        attempts = attempt,
                        "[{}] Max retries reached. Failed to fetch performance statistics.",
                        cycle.started_at
                    );
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<MetricsResponse, FetchError> {
        let response = self
            .client
            .get(self.request_url.clone())
            .header(API_ID_HEADER, self.api_id.clone())
            .header(API_KEY_HEADER, self.api_key.clone())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "Failed to read upstream error body");
                    String::new()
                }
            };
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }
}
