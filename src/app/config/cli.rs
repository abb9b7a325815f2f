use super::{ConfigError, LogFormat, LogLevel, SendFailurePolicy};
use crate::reliability::RetryPolicy;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.imperva.com/appdlv-dashboards-ui/v3/performance/statistics";

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Performance statistics API endpoint
    #[arg(long, env = "STATS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_base_url: String,

    /// API id sent in the x-API-Id header
    #[arg(long, env = "STATS_API_ID", default_value = "", hide_env_values = true)]
    pub api_id: String,

    /// API key sent in the x-API-Key header
    #[arg(long, env = "STATS_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Comma separated site ids to query
    #[arg(long, env = "STATS_SITE_IDS", value_delimiter = ',')]
    pub site_ids: Vec<String>,

    /// Verify the statistics API certificate
    #[arg(
        long,
        env = "STATS_API_VERIFY_TLS",
        action = ArgAction::Set,
        default_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub api_verify_tls: bool,

    /// Event collector endpoint URL
    #[arg(long, env = "SINK_URL", default_value = "")]
    pub sink_url: String,

    /// Collector token sent in the Authorization header
    #[arg(long, env = "SINK_TOKEN", default_value = "", hide_env_values = true)]
    pub sink_token: String,

    /// Authorization scheme placed before the token
    #[arg(long, env = "SINK_AUTH_SCHEME", default_value = "Splunk")]
    pub sink_auth_scheme: String,

    /// Verify the collector certificate
    #[arg(
        long,
        env = "SINK_VERIFY_TLS",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    pub sink_verify_tls: bool,

    /// Sourcetype stamped on every event
    #[arg(long, env = "SINK_SOURCETYPE", default_value = "json_http")]
    pub sink_sourcetype: String,

    /// Index stamped on every event
    #[arg(long, env = "SINK_INDEX", default_value = "main")]
    pub sink_index: String,

    /// Log every outgoing event instead of the collector response
    #[arg(
        long,
        env = "VERBOSE",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    pub verbose: bool,

    /// Fetch attempts per cycle
    #[arg(long, env = "RETRY_COUNT", default_value = "3")]
    pub retry_count: u32,

    /// Seconds between fetch attempts
    #[arg(long, env = "RETRY_DELAY_SECS", default_value = "5")]
    pub retry_delay_secs: u64,

    /// Randomize the retry delay by up to 50%
    #[arg(
        long,
        env = "RETRY_JITTER",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    pub retry_jitter: bool,

    /// Whole-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Upper bound on concurrently running cycles (unbounded when unset)
    #[arg(long, env = "MAX_IN_FLIGHT_CYCLES")]
    pub max_in_flight_cycles: Option<usize>,

    /// Behaviour after a record fails to send (abort or continue)
    #[arg(long, env = "SEND_FAILURE_POLICY", default_value = "abort")]
    pub send_failure_policy: SendFailurePolicy,

    /// Seconds to wait for in-flight cycles on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "30")]
    pub shutdown_grace_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub connect_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub shutdown_grace: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            api_id: String::new(),
            api_key: String::new(),
            site_ids: Vec::new(),
            api_verify_tls: true,
            sink_url: String::new(),
            sink_token: String::new(),
            sink_auth_scheme: "Splunk".to_string(),
            sink_verify_tls: false,
            sink_sourcetype: "json_http".to_string(),
            sink_index: "main".to_string(),
            verbose: false,
            retry_count: 3,
            retry_delay_secs: 5,
            retry_jitter: false,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_in_flight_cycles: None,
            send_failure_policy: SendFailurePolicy::Abort,
            shutdown_grace_secs: 30,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Parse command line and environment. A `--config-file`/`CONFIG_FILE`
    /// replaces everything else with the file's contents.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;
        match config.config_file {
            Some(path) => Self::from_file(path),
            None => config.finish(),
        }
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args)?.finish()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.finish()
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        self.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        self.shutdown_grace = Duration::from_secs(self.shutdown_grace_secs);

        self.site_ids = self
            .site_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        self.retry = RetryPolicy::new(self.retry_count, Duration::from_secs(self.retry_delay_secs))
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid retry count: {e}")))?
            .with_jitter(self.retry_jitter);

        Ok(())
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.post_process()?;
        self.validate()?;
        Ok(self)
    }
}
