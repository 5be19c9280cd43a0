use std::time::Duration;

use rand::Rng;

use crate::core::config::RetrySettings;

/// Exponential backoff with proportional jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Extra random delay as a fraction of the computed delay
    pub jitter: f64,
}

impl RetryPolicy {
    /// Policy that never sleeps between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let base_ms = self.initial_delay.as_millis() as f64
            * self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let capped = base_ms.min(max_ms);

        let with_jitter = if self.jitter > 0.0 && capped > 0.0 {
            let extra = rand::rng().random::<f64>() * self.jitter * capped;
            (capped + extra).min(max_ms)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier,
            jitter: settings.jitter.clamp(0.0, 1.0),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_without_jitter() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(4000));
    }

    #[test]
    fn delays_are_capped() {
        let policy = RetryPolicy::default();
        for retry in [10, 30, 200] {
            assert!(policy.delay_for_retry(retry) <= Duration::from_secs(60));
        }
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay_for_retry(0);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn zero_attempts_still_try_once() {
        let settings = RetrySettings {
            max_attempts: 0,
            ..RetrySettings::default()
        };
        assert_eq!(RetryPolicy::from(&settings).max_attempts, 1);
        assert_eq!(RetryPolicy::immediate(0).delay_for_retry(3), Duration::ZERO);
    }
}
