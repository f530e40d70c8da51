//! Bounded retry around a single provider call.
//!
//! Upstream market-data providers are flaky and rate-sensitive; a small
//! bounded retry with a short fixed delay absorbs transient failures without
//! turning one symbol's failure into a fatal error for the whole batch.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry policy for a single provider call: a fixed attempt ceiling and a
/// fixed delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy with no delay between attempts. Lets retry behavior be tested
    /// without waiting on real time.
    pub fn no_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// Attempt `call` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between failed attempts.
///
/// Every failure is logged and swallowed; exhausting the attempt ceiling
/// yields `None`. This function never propagates an error past its boundary.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        match call().await {
            Ok(payload) => return Some(payload),
            Err(e) => {
                attempts += 1;
                warn!("Attempt {} failed for {}: {}", attempts, label, e);

                if attempts < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    None
}
