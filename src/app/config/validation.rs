use super::{Config, ConfigError};
use url::Url;

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {name} '{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidUrl(format!(
            "Invalid {name} '{value}': unsupported scheme '{scheme}'"
        ))),
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!("{name} must be set")));
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("statistics API URL", &self.api_base_url)?;
        validate_http_url("sink URL", &self.sink_url)?;

        require_non_empty("STATS_API_ID", &self.api_id)?;
        require_non_empty("STATS_API_KEY", &self.api_key)?;
        require_non_empty("SINK_TOKEN", &self.sink_token)?;
        require_non_empty("SINK_AUTH_SCHEME", &self.sink_auth_scheme)?;

        if self.site_ids.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one site id must be configured (STATS_SITE_IDS)".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request and connect timeouts must be greater than 0".to_string(),
            ));
        }

        if self.max_in_flight_cycles == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Max in-flight cycles must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}
