//! Bounded exponential backoff for the bootstrap readiness gate.
//!
//! Backoff formula: delay(n) = initial_sleep * multiplier^(n-1), bounded by
//! a maximum attempt count rather than a delay cap. The state is owned by
//! exactly one retry loop and discarded when the loop exits.

use std::time::Duration;

use tokio::sync::watch;

use crate::config::RetryConfig;
use crate::error::BootstrapError;

/// Exponential backoff state for a single retry loop.
///
/// Pure and deterministic: no clock access, no sleeping. Callers sleep for
/// whatever `next_delay` returns.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    current_delay: Duration,
    max_attempts: u32,
    multiplier: f64,
}

impl Backoff {
    /// Create backoff state from retry configuration, positioned at attempt 1.
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            attempt: 1,
            current_delay: Duration::from_millis(retry.initial_sleep_ms),
            max_attempts: retry.max_attempts,
            multiplier: retry.multiplier,
        }
    }

    /// Whether the attempt ceiling has not been reached yet.
    ///
    /// Returns false once the attempt counter passes `max_attempts`; callers
    /// must treat that as a hard stop.
    pub fn has_attempts_remaining(&self) -> bool {
        self.attempt <= self.max_attempts
    }

    /// The delay to sleep before the next attempt.
    ///
    /// Advances the attempt counter and grows the stored delay by the
    /// multiplier; successive calls yield a strictly increasing sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay;
        self.current_delay = self.current_delay.mul_f64(self.multiplier);
        self.attempt += 1;
        delay
    }

    /// The attempt the loop is currently on (1-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Sleep for `delay`, aborting early if shutdown is requested.
///
/// Bootstrap sleeps are the only intentional suspension points in the
/// readiness gate; an interrupted sleep surfaces as a `BootstrapError` so it
/// is never silently swallowed.
pub(crate) async fn interruptible_sleep(
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
    phase: &'static str,
) -> std::result::Result<(), BootstrapError> {
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown) => Err(BootstrapError::Interrupted { phase }),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Resolve once shutdown is requested.
///
/// A dropped sender means shutdown can no longer be requested, so that case
/// parks the branch instead of resolving.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
