use rand::Rng;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RetryError {
    #[error("Invalid retry configuration: {0}")]
    InvalidConfig(String),
}

/// Fixed-delay retry policy for the upstream fetch.
///
/// `max_attempts` counts the first attempt, so `3` means one try plus two retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, RetryError> {
        if max_attempts == 0 {
            return Err(RetryError::InvalidConfig(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
            jitter: false,
        })
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if !self.can_retry(attempt) {
            return None;
        }
        if self.jitter {
            Some(apply_jitter(self.delay))
        } else {
            Some(self.delay)
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64)
}
