//! Retry policy and per-batch retry state

use std::time::Duration;

use crate::config::{BackoffKind, EnrichmentConfig};

/// Delay applied after a failed attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    Fixed {
        delay: Duration,
    },
    Exponential {
        base: Duration,
        max: Duration,
        multiplier: f64,
        jitter: bool,
    },
}

impl BackoffStrategy {
    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential {
                base,
                max,
                multiplier,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(32) as i32;
                let raw = base.as_millis() as f64 * multiplier.powi(exponent);
                let capped = raw.min(max.as_millis() as f64);

                let millis = if *jitter {
                    let jitter_factor = 0.1;
                    capped + capped * jitter_factor * (rand::random::<f64>() - 0.5) * 2.0
                } else {
                    capped
                };

                Duration::from_millis(millis.max(0.0) as u64)
            }
        }
    }
}

/// How often and how patiently a batch is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Fixed delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, BackoffStrategy::Fixed { delay })
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        let backoff = match config.backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed {
                delay: config.retry_backoff(),
            },
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                base: config.retry_backoff(),
                max: config.max_backoff(),
                multiplier: 2.0,
                jitter: config.backoff_jitter,
            },
        };
        Self::new(config.max_retries, backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// State entered when a batch starts
    pub fn begin(&self) -> RetryState {
        RetryState::Attempting { attempt: 1 }
    }

    /// State entered after attempt number `attempt` failed
    pub fn after_failure(&self, attempt: u32) -> RetryState {
        if attempt >= self.max_attempts {
            RetryState::Exhausted { attempts: attempt }
        } else {
            RetryState::BackingOff {
                attempt,
                delay: self.backoff.delay_for(attempt),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EnrichmentConfig::default())
    }
}

/// Where a batch is in its retry sequence
///
/// `Pending -> Attempting -> {Succeeded | BackingOff -> Attempting | Exhausted | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    Attempting { attempt: u32 },
    BackingOff { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Exhausted { .. } | Self::Cancelled { .. }
        )
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Pending => 0,
            Self::Attempting { attempt } => attempt.saturating_sub(1),
            Self::BackingOff { attempt, .. } => attempt,
            Self::Succeeded { attempts }
            | Self::Exhausted { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }

    /// Next attempt after a completed backoff
    pub fn resume(self) -> Self {
        match self {
            Self::Pending => Self::Attempting { attempt: 1 },
            Self::BackingOff { attempt, .. } => Self::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}
