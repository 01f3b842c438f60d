//! Retrying provider calls.
//!
//! [`RetryConfig::run`] re-issues a call while it fails with an error that
//! [`ApiError::is_transient`] accepts (429, 5xx, connect failures and
//! timeouts). Anything else, including 400 and 401, is returned on the spot.
//!
//! Backoff doubles from `base_delay` up to `max_delay`. With jitter on, each
//! [`run`](RetryConfig::run) draws its own seed, so concurrent relays that
//! hit the same rate limit sleep for different amounts and do not retry in
//! lockstep.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tracing::warn;

use crate::ApiError;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. 0 disables retrying.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single backoff.
    pub max_delay: Duration,
    /// Scale each backoff by a per-call factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self::with_retries(0)
    }

    /// Un-jittered backoff after failed attempt `attempt` (0-indexed):
    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff for `attempt` as seen by the call identified by `seed`.
    pub fn delay_for_attempt(&self, attempt: u32, seed: u64) -> Duration {
        let backoff = self.backoff(attempt);
        if !self.jitter {
            return backoff;
        }
        let unit = (mix(seed ^ u64::from(attempt)) >> 11) as f64 / (1u64 << 53) as f64;
        backoff.mul_f64(0.5 + 0.5 * unit)
    }

    /// Run `op`, retrying transient failures.
    ///
    /// `op` is called at most `max_retries + 1` times. The last error is
    /// returned once retries run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let seed = next_seed();
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && e.is_transient() => {
                    let delay = self.delay_for_attempt(attempt, seed);
                    warn!(
                        "Transient provider error (attempt {}/{}), retrying in {:.2}s: {e}",
                        attempt + 1,
                        self.max_retries.saturating_add(1),
                        delay.as_secs_f64(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A fresh seed per retry loop: a process-wide counter offset by the clock.
fn next_seed() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    COUNTER.fetch_add(1, Ordering::Relaxed) ^ (u64::from(nanos) << 32)
}

/// splitmix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
