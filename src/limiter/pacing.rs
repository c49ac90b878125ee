use crate::config::RateLimitSettings;
use std::time::Duration;
use tokio::time::Instant;

/// Mutable pacing state shared by every caller of one limiter
///
/// Only ever touched inside the limiter's critical section.
#[derive(Debug, Clone)]
pub(crate) struct PacingState {
    /// Allowed requests per second, within `[min_rate, max_rate]`
    pub current_rate: f64,

    /// Failures since the last success, across all callers
    pub consecutive_failures: u32,

    /// Dispatch time handed to the most recent caller
    pub last_dispatch: Option<Instant>,
}

impl PacingState {
    pub fn new(initial_rate: f64) -> Self {
        Self {
            current_rate: initial_rate,
            consecutive_failures: 0,
            last_dispatch: None,
        }
    }

    /// Spacing between dispatches at the current rate
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.current_rate)
    }

    /// Reserves the next dispatch slot and returns when it opens
    ///
    /// The slot is `interval` after the previously reserved one, or `now` if
    /// that is already in the past.
    pub fn reserve_slot(&mut self, now: Instant) -> Instant {
        let slot = match self.last_dispatch {
            Some(last) => std::cmp::max(now, last + self.interval()),
            None => now,
        };
        self.last_dispatch = Some(slot);
        slot
    }

    pub fn record_success(&mut self, settings: &RateLimitSettings) {
        self.consecutive_failures = 0;
        self.current_rate = (self.current_rate * settings.recovery_factor).min(settings.max_rate);
    }

    pub fn record_failure(&mut self, settings: &RateLimitSettings) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current_rate = (self.current_rate / settings.backoff_multiplier).max(settings.min_rate);
    }

    pub fn reset(&mut self, settings: &RateLimitSettings) {
        self.current_rate = settings.initial_rate;
        self.consecutive_failures = 0;
        self.last_dispatch = None;
    }
}
