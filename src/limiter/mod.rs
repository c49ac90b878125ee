//! Adaptive rate limiter for outbound calls
//!
//! Paces calls to a flaky or quota-bound endpoint. The allowed rate rises by
//! `recovery_factor` on every success and falls by `backoff_multiplier` on
//! every failure, bounded by `[min_rate, max_rate]`. Failed tasks are retried
//! through the same pacing gate until `max_retries` retries are spent.
//!
//! # Concurrency
//!
//! All callers share one critical section that reads the current interval,
//! reserves the next dispatch slot and updates state. The lock is released
//! before sleeping, so callers queue up on distinct slots while their tasks
//! still run concurrently once released.

mod pacing;

use crate::config::RateLimitSettings;
use crate::ConfigError;
use pacing::PacingState;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Read-only snapshot of limiter state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterStats {
    pub current_rate: f64,
    pub consecutive_failures: u32,
}

/// Adaptive, retrying rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    settings: RateLimitSettings,
    state: Mutex<PacingState>,
}

/// Checks rate limiter parameters
///
/// All rates must be positive and finite with
/// `min_rate <= initial_rate <= max_rate`; the backoff multiplier and recovery
/// factor must be at least 1 so that failures never speed the limiter up.
pub fn validate_settings(settings: &RateLimitSettings) -> Result<(), ConfigError> {
    for (name, value) in [
        ("initial_rate", settings.initial_rate),
        ("min_rate", settings.min_rate),
        ("max_rate", settings.max_rate),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a positive number, got {}",
                name, value
            )));
        }
    }

    if settings.min_rate > settings.initial_rate || settings.initial_rate > settings.max_rate {
        return Err(ConfigError::Validation(format!(
            "rates must satisfy min_rate <= initial_rate <= max_rate, got {} <= {} <= {}",
            settings.min_rate, settings.initial_rate, settings.max_rate
        )));
    }

    if !settings.backoff_multiplier.is_finite() || settings.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be >= 1, got {}",
            settings.backoff_multiplier
        )));
    }

    if !settings.recovery_factor.is_finite() || settings.recovery_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "recovery_factor must be >= 1, got {}",
            settings.recovery_factor
        )));
    }

    Ok(())
}

impl RateLimiter {
    /// Creates a limiter, rejecting invalid settings up front
    ///
    /// # Example
    ///
    /// ```
    /// use creator_scope::config::RateLimitSettings;
    /// use creator_scope::limiter::RateLimiter;
    ///
    /// let limiter = RateLimiter::new("api", RateLimitSettings::default()).unwrap();
    /// assert_eq!(limiter.get_stats().consecutive_failures, 0);
    /// ```
    pub fn new(name: impl Into<String>, settings: RateLimitSettings) -> Result<Self, ConfigError> {
        validate_settings(&settings)?;
        Ok(Self {
            name: name.into(),
            state: Mutex::new(PacingState::new(settings.initial_rate)),
            settings,
        })
    }

    /// Runs `task` under the limiter, retrying failures
    ///
    /// Each attempt waits for its own dispatch slot. The task is attempted at
    /// most `max_retries + 1` times; the last error is returned unchanged.
    pub async fn execute<F, Fut, T, E>(&self, mut task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retries: u32 = 0;

        loop {
            self.wait_for_slot().await;

            match task().await {
                Ok(value) => {
                    self.lock_state().record_success(&self.settings);
                    return Ok(value);
                }
                Err(err) => {
                    let stats = {
                        let mut state = self.lock_state();
                        state.record_failure(&self.settings);
                        LimiterStats {
                            current_rate: state.current_rate,
                            consecutive_failures: state.consecutive_failures,
                        }
                    };

                    if retries >= self.settings.max_retries {
                        tracing::warn!(
                            "[{}] giving up after {} attempts: {}",
                            self.name,
                            retries + 1,
                            err
                        );
                        return Err(err);
                    }

                    retries += 1;
                    tracing::warn!(
                        "[{}] attempt {} failed ({}), retrying at {:.3} req/s",
                        self.name,
                        retries,
                        err,
                        stats.current_rate
                    );
                }
            }
        }
    }

    /// Returns a snapshot of the current rate and failure streak
    pub fn get_stats(&self) -> LimiterStats {
        let state = self.lock_state();
        LimiterStats {
            current_rate: state.current_rate,
            consecutive_failures: state.consecutive_failures,
        }
    }

    /// Restores the initial rate and clears the failure streak
    pub fn reset(&self) {
        self.lock_state().reset(&self.settings);
        tracing::debug!("[{}] limiter reset", self.name);
    }

    /// Reserves a dispatch slot and sleeps until it opens
    async fn wait_for_slot(&self) {
        let now = Instant::now();
        let slot = self.lock_state().reserve_slot(now);

        if slot > now {
            tracing::trace!("[{}] waiting {:?} for dispatch slot", self.name, slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }

    // State is plain numbers, so a poisoned lock is still usable.
    fn lock_state(&self) -> MutexGuard<'_, PacingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
