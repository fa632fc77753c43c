// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry and backoff primitives for transient failures.
//!
//! The transport layer retries; semantic operations do not. A failed
//! JSON-RPC round trip is worth repeating, a rejected download submission is
//! not, so callers wrap only the former in [`retry`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use downpour_core::DownpourError;

/// Retry schedule: `tries` attempts, delay doubling after each failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub tries: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiply each delay by a random factor in [0.7, 1.3).
    pub jitter: bool,
}

impl RetryPolicy {
    pub const fn new(tries: u32, base_delay: Duration) -> Self {
        Self {
            tries,
            base_delay,
            jitter: true,
        }
    }

    /// Delay before attempt `n + 1` given the nominal delay for attempt `n`.
    fn sleep_for(&self, nominal: Duration) -> Duration {
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.7..1.3);
            nominal.mul_f64(factor)
        } else {
            nominal
        }
    }
}

/// Run `op` up to `policy.tries` times, sleeping with jittered doubling
/// backoff between failures. The last error wins.
pub async fn retry<F, Fut, T>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, DownpourError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownpourError>>,
{
    let mut delay = policy.base_delay;
    let mut last_err: Option<DownpourError> = None;

    for attempt in 1..=policy.tries.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < policy.tries {
                    warn!(%label, attempt, error = %err, "transient failure, backing off");
                    tokio::time::sleep(policy.sleep_for(delay)).await;
                    delay *= 2;
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| DownpourError::Internal(format!("{label}: no attempts made"))))
}

/// Like [`retry`], but gives up immediately when `cancel` fires.
///
/// Cancellation is passed through as [`DownpourError::Timeout`]-free control
/// flow: the pending backoff sleep is abandoned and the last real error is
/// returned, so a pause/cancel never waits out a backoff schedule.
pub async fn retry_cancellable<F, Fut, T>(
    policy: RetryPolicy,
    label: &str,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, DownpourError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownpourError>>,
{
    let mut delay = policy.base_delay;
    let mut last_err: Option<DownpourError> = None;

    for attempt in 1..=policy.tries.max(1) {
        if cancel.is_cancelled() {
            break;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < policy.tries {
                    warn!(%label, attempt, error = %err, "transient failure, backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(policy.sleep_for(delay)) => {}
                        _ = cancel.cancelled() => {
                            return Err(err);
                        }
                    }
                    delay *= 2;
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| DownpourError::Internal(format!("{label}: cancelled before start"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let policy = RetryPolicy {
            tries: 4,
            base_delay: Duration::from_millis(1),
            jitter: false,
        };
        let result = retry(policy, "test", move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DownpourError::Internal("boom".into()))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_tries_and_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let policy = RetryPolicy {
            tries: 3,
            base_delay: Duration::from_millis(1),
            jitter: false,
        };
        let result: Result<(), _> = retry(policy, "test", move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move { Err(DownpourError::Internal(format!("fail {n}"))) }
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("fail 2"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backoff_doubles_between_attempts() {
        let policy = RetryPolicy {
            tries: 3,
            base_delay: Duration::from_millis(10),
            jitter: false,
        };
        let start = Instant::now();
        let result: Result<(), _> = retry(policy, "test", || async {
            Err(DownpourError::Internal("boom".into()))
        })
        .await;
        assert!(result.is_err());
        // 10ms + 20ms of sleeps at minimum.
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let token = CancellationToken::new();
        let policy = RetryPolicy {
            tries: 5,
            base_delay: Duration::from_secs(60),
            jitter: false,
        };
        let t = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            t.cancel();
        });
        let start = Instant::now();
        let result: Result<(), _> = retry_cancellable(policy, "test", &token, || async {
            Err(DownpourError::Internal("boom".into()))
        })
        .await;
        assert!(result.is_err());
        // Must not have waited out the 60s backoff.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_operation() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<(), _> = retry_cancellable(policy, "test", &token, move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
