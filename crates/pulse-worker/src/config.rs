//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Probability that the classifier draws `safe`
    pub safe_probability: f64,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 8,
            safe_probability: 0.8,
            shutdown_timeout: Duration::from_secs(60),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(120),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            safe_probability: std::env::var("MODERATION_SAFE_PROBABILITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|p| (0.0..=1.0).contains(p))
                .unwrap_or(defaults.safe_probability),
            shutdown_timeout: Duration::from_secs(
                std::env::var("SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_safe_probability_is_biased_toward_safe() {
        let config = WorkerConfig::default();
        assert!((config.safe_probability - 0.8).abs() < f64::EPSILON);
    }
}
