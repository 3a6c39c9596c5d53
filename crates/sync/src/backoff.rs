// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry delays between transient failures.

use rand::Rng;
use std::time::Duration;

/// Decides how long to wait before retrying after `attempts` transient failures.
pub trait BackoffPolicy: Send + Sync {
    fn delay(&self, attempts: u32) -> Duration;
}

impl<F> BackoffPolicy for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempts: u32) -> Duration {
        self(attempts)
    }
}

/// Exponential backoff: `base * 2^(attempts - 1)`, capped, plus random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub cap: Duration,
    /// Fraction of the delay added as uniform random jitter (0.0 disables it).
    pub jitter: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoff { base: Duration::from_secs(1), cap: Duration::from_secs(30), jitter: 0.2 }
    }
}

impl ExponentialBackoff {
    /// The delay without jitter.
    pub fn exponential(&self, attempts: u32) -> Duration {
        let shift = attempts.saturating_sub(1).min(31);
        let factor = 1u32 << shift;
        std::cmp::min(self.base.saturating_mul(factor), self.cap)
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempts: u32) -> Duration {
        let delay = self.exponential(attempts);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let max_jitter = delay.mul_f64(self.jitter.min(1.0));
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=max_jitter);
        delay + jitter
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
