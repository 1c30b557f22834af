//! Circuit breaker guarding the upstream registry

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::ProxyError;

/// Circuit breaker settings
#[derive(Clone, Debug)]
pub struct BreakerConfig {
    /// Consecutive failed fetches before the circuit opens; 0 disables it
    pub failure_threshold: u32,
    /// How long an open circuit rejects fetches before allowing a trial
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { until: Instant },
    /// One trial fetch is in flight
    HalfOpen,
}

/// Tracks consecutive upstream failures and short-circuits fetches while
/// the upstream is considered down
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState::Closed { failures: 0 }),
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.lock()
    }

    /// Ask permission for one fetch
    pub fn acquire(&self) -> Result<(), ProxyError> {
        self.acquire_at(Instant::now())
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, CircuitState::Closed { .. }) {
            info!("Upstream recovered, closing circuit");
        }
        *state = CircuitState::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    fn acquire_at(&self, now: Instant) -> Result<(), ProxyError> {
        if self.config.failure_threshold == 0 {
            return Ok(());
        }

        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { .. } => Ok(()),
            CircuitState::Open { until } if now >= until => {
                info!("Circuit half-open, allowing a trial fetch");
                *state = CircuitState::HalfOpen;
                Ok(())
            }
            CircuitState::Open { until } => Err(ProxyError::CircuitOpen {
                retry_after: until - now,
            }),
            CircuitState::HalfOpen => Err(ProxyError::CircuitOpen {
                retry_after: Duration::ZERO,
            }),
        }
    }

    fn record_failure_at(&self, now: Instant) {
        if self.config.failure_threshold == 0 {
            return;
        }

        let mut state = self.state.lock();
        let failures = match *state {
            CircuitState::Closed { failures } => failures + 1,
            CircuitState::Open { .. } | CircuitState::HalfOpen => self.config.failure_threshold,
        };

        if failures >= self.config.failure_threshold {
            warn!(
                "Opening circuit after {} consecutive failures for {:?}",
                failures, self.config.open_duration
            );
            *state = CircuitState::Open {
                until: now + self.config.open_duration,
            };
        } else {
            *state = CircuitState::Closed { failures };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            open_duration: Duration::from_secs(30),
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = breaker(2);
        let now = Instant::now();

        breaker.record_failure_at(now);
        assert!(breaker.acquire_at(now).is_ok());

        breaker.record_failure_at(now);
        assert!(matches!(
            breaker.acquire_at(now + Duration::from_secs(10)),
            Err(ProxyError::CircuitOpen { retry_after }) if retry_after == Duration::from_secs(20)
        ));
    }

    #[test]
    fn test_success_resets_failures() {
        let breaker = breaker(2);
        let now = Instant::now();

        breaker.record_failure_at(now);
        breaker.record_success();
        breaker.record_failure_at(now);
        assert_eq!(breaker.state(), CircuitState::Closed { failures: 1 });
    }

    #[test]
    fn test_half_open_allows_single_trial() {
        let breaker = breaker(1);
        let now = Instant::now();
        breaker.record_failure_at(now);

        let later = now + Duration::from_secs(30);
        assert!(breaker.acquire_at(later).is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.acquire_at(later).is_err());

        breaker.record_success();
        assert!(breaker.acquire_at(later).is_ok());
    }

    #[test]
    fn test_failed_trial_reopens() {
        let breaker = breaker(3);
        let now = Instant::now();
        for _ in 0..3 {
            breaker.record_failure_at(now);
        }

        let later = now + Duration::from_secs(31);
        assert!(breaker.acquire_at(later).is_ok());
        breaker.record_failure_at(later);
        assert_eq!(
            breaker.state(),
            CircuitState::Open {
                until: later + Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn test_zero_threshold_disables() {
        let breaker = breaker(0);
        let now = Instant::now();
        for _ in 0..10 {
            breaker.record_failure_at(now);
        }
        assert!(breaker.acquire_at(now).is_ok());
    }
}
