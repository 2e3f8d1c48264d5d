//! Generic retry with exponential backoff
//!
//! A resilient-call primitive with no knowledge of printing. The caller
//! supplies the predicate that separates transient from fatal errors.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::RetryOptions;

/// Invoke `op`, retrying transient failures with exponential backoff.
///
/// On failure the `retryable` predicate decides: `false` fails immediately
/// without further attempts, `true` sleeps `min(base_delay * 2^n, max_delay)`
/// (plus jitter when enabled) and tries again, up to `max_retries` attempts
/// in total. Exhaustion returns the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    op_name: &str,
    options: &RetryOptions,
    retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = options.max_retries.max(1);
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !retryable(&e) => {
                warn!(op = op_name, error = %e, "Non-retryable error, giving up");
                return Err(e);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    warn!(
                        op = op_name,
                        attempts = max_attempts,
                        error = %e,
                        "All attempts exhausted"
                    );
                    return Err(e);
                }

                let delay = backoff_delay(options, attempt - 1);
                warn!(
                    op = op_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay before retry number `attempt + 1` (0-based).
fn backoff_delay(options: &RetryOptions, attempt: u32) -> Duration {
    let exp = options
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let mut delay = exp.min(options.max_delay);

    if options.jitter {
        let frac: f64 = rand::thread_rng().gen_range(0.0..0.2);
        delay += delay.mul_f64(frac);
    }

    delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn opts(max_retries: u32) -> RetryOptions {
        RetryOptions {
            max_retries,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = retry_with_backoff("test", &opts(5), |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_short_circuits() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff("test", &opts(5), |_| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("fatal".to_string()) }
        })
        .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff("test", &opts(3), |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("fail {n}")) }
        })
        .await;

        assert_eq!(result, Err("fail 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_doubles_and_caps() {
        let options = opts(10);
        assert_eq!(backoff_delay(&options, 0), Duration::from_millis(10));
        assert_eq!(backoff_delay(&options, 1), Duration::from_millis(20));
        assert_eq!(backoff_delay(&options, 2), Duration::from_millis(40));
        // Capped at max_delay from here on
        assert_eq!(backoff_delay(&options, 4), Duration::from_millis(100));
        assert_eq!(backoff_delay(&options, 20), Duration::from_millis(100));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let options = RetryOptions {
            jitter: true,
            ..opts(3)
        };

        for _ in 0..50 {
            let delay = backoff_delay(&options, 0);
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(12));
        }
    }
}
