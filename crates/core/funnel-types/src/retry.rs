//! Retry budget and backoff formula for jobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
///
/// The delay before retrying after attempt `i` (zero-based) is
/// `backoff_unit * 2^i / 4`: a quarter unit, half a unit, one unit, two
/// units and so on. There is no jitter. The ceiling is off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per job (the retry budget).
    pub max_attempts: u32,

    /// Time unit the backoff formula is expressed in.
    #[serde(with = "crate::duration_millis")]
    pub backoff_unit: Duration,

    /// Optional ceiling for a single backoff sleep.
    #[serde(with = "crate::duration_millis::option", default)]
    pub max_backoff: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(1),
            max_backoff: None,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff time unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Cap every backoff sleep at `max`.
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = Some(max);
        self
    }

    /// Calculate the backoff duration after the given zero-based attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt.min(i32::MAX as u32) as i32) / 4.0;
        let base = Duration::try_from_secs_f64(self.backoff_unit.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX);

        match self.max_backoff {
            Some(max) => base.min(max),
            None => base,
        }
    }

    /// Total time slept by a job whose every attempt failed transiently.
    ///
    /// No sleep follows the final attempt.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.backoff_duration(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}
