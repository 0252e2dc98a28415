//! Retry Executor — bounded retry with exponential backoff around one unit of
//! model work (invoke + normalize).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempts per model call, for extractors and the synthesizer alike.
pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

/// Delay slept before attempt `attempt + 1`, where `attempt` is 1-based.
/// 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_DELAY_MS * (1u64 << exponent))
}

/// Runs `operation` until it succeeds or `max_attempts` consecutive failures
/// have been observed, then returns the last error.
///
/// `operation` is called afresh for every attempt; nothing carries over.
pub async fn execute_with_retry<T, E, F, Fut>(
    label: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                warn!("{label}: giving up after {attempt} attempts: {e}");
                return Err(e);
            }
            Err(e) => {
                let delay = backoff_delay(attempt);
                warn!(
                    "{label}: attempt {}/{} failed ({e}), retrying after {}ms...",
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_backoff_doubles_from_one_second() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds_after_three_seconds() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<&str, String> = execute_with_retry("flaky", 3, || {
            let calls = calls.clone();
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err("boom".to_string()),
                    _ => Ok("done"),
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff; the paused clock may round up to the next tick.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3010), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), String> = execute_with_retry("always-down", 3, || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure #{n}"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure #2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let started = Instant::now();
        let result: Result<u8, String> = execute_with_retry("ok", 3, || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), String> = execute_with_retry("zero", 0, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("no".to_string())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
