// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

/// Configuration for attestation polling behavior.
///
/// Polls start at `initial_interval` and back off by `multiplier` up to
/// `max_interval`. The wait gives up only once `max_wait` has elapsed on the
/// [`crate::Clock`], never after a fixed number of attempts.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use cctp_orchestrator::PollingConfig;
///
/// // Standard transfers: attestation takes 13-19 minutes.
/// let config = PollingConfig::standard();
///
/// let config = PollingConfig::fast_transfer()
///     .with_max_wait(Duration::from_secs(600));
/// assert_eq!(config.max_wait, Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollingConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Growth factor between consecutive waits; `1.0` polls at a fixed rate.
    pub multiplier: f64,
    /// Hard deadline for the whole wait.
    pub max_wait: Duration,
    /// Wait used after a rate limit response that carried no `Retry-After`.
    pub rate_limit_fallback: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PollingConfig {
    /// Standard-finality transfers: 10s growing to 60s, 45 minute deadline.
    pub fn standard() -> Self {
        Self {
            initial_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(60),
            multiplier: 1.5,
            max_wait: Duration::from_secs(45 * 60),
            rate_limit_fallback: Duration::from_secs(300),
        }
    }

    /// Fast transfers usually attest in under 30 seconds.
    pub fn fast_transfer() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(10),
            multiplier: 1.5,
            max_wait: Duration::from_secs(10 * 60),
            rate_limit_fallback: Duration::from_secs(60),
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_rate_limit_fallback(mut self, fallback: Duration) -> Self {
        self.rate_limit_fallback = fallback;
        self
    }

    /// Wait before the poll following attempt `attempt` (0-based):
    /// `initial * multiplier^attempt`, capped at `max_interval`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.initial_interval.as_secs_f64() * factor;
        let max_secs = self.max_interval.as_secs_f64();
        if !secs.is_finite() || secs >= max_secs {
            self.max_interval
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = PollingConfig::standard()
            .with_initial_interval(Duration::from_secs(10))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(60));

        assert_eq!(config.backoff_for_attempt(0), Duration::from_secs(10));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(20));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(40));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_secs(60));
        assert_eq!(config.backoff_for_attempt(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_fixed_rate_polling() {
        let config = PollingConfig::fast_transfer().with_multiplier(1.0);
        assert_eq!(config.backoff_for_attempt(0), config.initial_interval);
        assert_eq!(config.backoff_for_attempt(10), config.initial_interval);
    }

    #[test]
    fn test_multiplier_below_one_is_clamped() {
        let config = PollingConfig::standard().with_multiplier(0.5);
        assert_eq!(config.multiplier, 1.0);
    }

    #[test]
    fn test_presets() {
        assert_eq!(PollingConfig::default(), PollingConfig::standard());
        assert!(PollingConfig::fast_transfer().max_wait < PollingConfig::standard().max_wait);
    }
}
