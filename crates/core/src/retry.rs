// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter for transient I/O.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    /// Total tries, including the first.
    pub tries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            factor: 3,
            max_delay: Duration::from_secs(3),
            tries: 3,
        }
    }
}

impl Backoff {
    /// Upper bound of the delay after failed try `n` (0-based).
    pub fn ceiling(&self, n: u32) -> Duration {
        let grown = self.initial.saturating_mul(self.factor.saturating_pow(n));
        grown.min(self.max_delay)
    }

    /// Jittered delay in `[ceiling/2, ceiling]`.
    pub fn delay(&self, n: u32) -> Duration {
        let ceiling = self.ceiling(n);
        let half = ceiling / 2;
        let span = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
    }

    /// Run `op` until it succeeds, fails permanently, or tries run out.
    pub async fn retry<T, E, F, Fut>(
        &self,
        what: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut n = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if n + 1 < self.tries && is_transient(&e) => {
                    let delay = self.delay(n);
                    tracing::warn!(what, attempt = n + 1, error = %e, ?delay, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                    n += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
