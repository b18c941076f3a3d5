//! Retry options with defaults, validated once when the retry transport is built.

use crate::backoff::BackoffConfig;
use std::time::Duration;

/// Invalid retry configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("randomization factor must be within [0, 1], got {0}")]
    RandomizationFactor(f64),
    #[error("max interval must be greater than zero")]
    ZeroMaxInterval,
    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,
    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidSeconds { field: &'static str, value: f64 },
}

/// Everything that shapes one retry sequence apart from the evaluator and logger.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Elapsed-time budget, interval cap and jitter.
    pub backoff: BackoffConfig,
    /// Per-attempt deadline, applied only to requests without their own deadline.
    pub request_timeout: Option<Duration>,
    /// Attach a dump of the request to the error of a retried attempt.
    pub log_request: bool,
    /// Attach a dump of the response to the error of a retried attempt.
    pub log_response: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            request_timeout: None,
            log_request: false,
            log_response: false,
        }
    }
}

impl RetryOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let factor = self.backoff.randomization_factor;
        if !(0.0..=1.0).contains(&factor) {
            return Err(ConfigError::RandomizationFactor(factor));
        }
        if self.backoff.max_interval.is_zero() {
            return Err(ConfigError::ZeroMaxInterval);
        }
        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }

    /// True when retried responses must be dumped rather than just drained.
    pub fn dumps_enabled(&self) -> bool {
        self.log_request || self.log_response
    }
}

/// Converts a seconds value from configuration into a `Duration`.
pub fn duration_from_secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidSeconds { field, value })
}
