//! Configuration for pollers, the aggregator, and the sampler.

use serde::{Deserialize, Serialize};
use vitals_types::{Duration, SampleError, SampleResult};

/// Per-source polling behavior: one attempt deadline, a retry budget, and
/// the back-off schedule between attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait before the first retry.
    #[serde(default = "default_base_interval")]
    pub base_interval: Duration,

    /// Upper bound on the wait between retries.
    #[serde(default = "default_max_interval")]
    pub max_interval: Duration,

    /// Deadline for a single attempt.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum number of attempts. Zero means unlimited.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Multiplier applied to the wait after each failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_base_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: default_base_interval(),
            max_interval: default_max_interval(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> SampleResult<()> {
        if self.timeout.is_zero() {
            return Err(SampleError::Validation("poll timeout must be positive".into()));
        }
        if self.base_interval.is_zero() {
            return Err(SampleError::Validation(
                "base_interval must be positive".into(),
            ));
        }
        if self.max_interval < self.base_interval {
            return Err(SampleError::Validation(
                "max_interval must be >= base_interval".into(),
            ));
        }
        if self.backoff_factor < 1.0 {
            return Err(SampleError::Validation(
                "backoff_factor must be >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for one collection round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Polling behavior applied to every collector in the round.
    #[serde(default)]
    pub poll: PollConfig,

    /// Wall-clock budget for the whole fan-out/fan-in cycle. Collectors
    /// still pending at the deadline are reported as timed out.
    #[serde(default = "default_round_deadline")]
    pub round_deadline: Duration,

    /// When set, a round with zero successes is an error instead of a
    /// snapshot full of failures.
    #[serde(default)]
    pub fail_when_all_failed: bool,
}

fn default_round_deadline() -> Duration {
    Duration::from_secs(10)
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            round_deadline: default_round_deadline(),
            fail_when_all_failed: false,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> SampleResult<()> {
        self.poll.validate()?;
        if self.round_deadline.is_zero() {
            return Err(SampleError::Validation(
                "round_deadline must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the periodic sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Time between the start of consecutive collection rounds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Number of snapshots retained. Zero disables retention.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_history_capacity() -> usize {
    60
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            history_capacity: default_history_capacity(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> SampleResult<()> {
        if self.tick_interval.is_zero() {
            return Err(SampleError::Validation(
                "tick_interval must be positive".into(),
            ));
        }
        self.aggregator.validate()
    }
}
