use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::time::Duration;

/// Whether an error observed during submission should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    NonRetryable,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_seed: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_millis(100), max_delay: Duration::from_secs(10), jitter_seed: 0 }
    }
}

/// Computes the delay before `attempt` (1-indexed), honoring an explicit
/// `retry_after` override (e.g. from a 429 response header) when present.
/// Jitter is seeded deterministically from `(jitter_seed, attempt)` rather
/// than wall-clock entropy, so retry delays are reproducible in tests
/// (grounded in `original_source/src/btcbot/services/retry.py`, adapted
/// from a single-seeded PRNG stream to an attempt-keyed seed so concurrent
/// retries never share mutable RNG state).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(explicit) = retry_after {
        return explicit;
    }
    let raw_delay_ms = policy.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    let raw_delay_ms = raw_delay_ms.min(policy.max_delay.as_millis() as u64);

    let mut rng = StdRng::seed_from_u64(policy.jitter_seed.wrapping_add(attempt as u64));
    let jitter_multiplier: f64 = 0.5 + rng.random::<f64>();
    let delay_ms = (raw_delay_ms as f64 * jitter_multiplier) as u64;
    Duration::from_millis(delay_ms)
}

/// Runs `attempt_fn` up to `policy.max_attempts` times, classifying each
/// error with `classify` and sleeping `backoff_delay` between retryable
/// failures via the injected `sleep`. Returns the last error once attempts
/// are exhausted or a non-retryable error is hit.
pub async fn retry_with_backoff<T, E, F, Fut, C, S, Sleep>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
    classify: C,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: Fn(&E) -> (RetryClass, Option<Duration>),
    S: FnMut(Duration) -> Sleep,
    Sleep: std::future::Future<Output = ()>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let (class, retry_after) = classify(&err);
                if class == RetryClass::NonRetryable || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = backoff_delay(policy, attempt, retry_after);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
