//! Retrying query executor.
//!
//! Attempts are strictly sequential with capped exponential backoff between
//! them. Every failure is retried identically until the budget is exhausted;
//! the final attempt's error propagates to the caller.

use std::future::Future;
use std::time::Duration;

use crate::error::DbError;

/// Backoff cap between attempts.
const MAX_BACKOFF: Duration = Duration::from_millis(5000);

/// Delay slept after failed attempt `attempt` (1-indexed):
/// `min(1000 * 2^(attempt - 1), 5000)` ms.
pub fn backoff_delay(attempt: u32) -> Duration {
    let millis = 1000u64.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(32));
    MAX_BACKOFF.min(Duration::from_millis(millis))
}

/// Execute `op` with up to `max_retries + 1` attempts.
///
/// `op` is invoked once per attempt and must produce a fresh query future
/// each time. Success on any attempt short-circuits with that attempt's
/// rows; the last attempt's failure is propagated unchanged.
pub async fn execute_with_retry<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let total_attempts = max_retries + 1;
    let mut last_error = None;

    for attempt in 1..=total_attempts {
        tracing::debug!(attempt, total_attempts, "executing query");
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let err = DbError::from_sqlx(err);
                tracing::warn!(attempt, total_attempts, error = %err, "query attempt failed");
                if attempt == total_attempts {
                    return Err(err);
                }
                let delay = backoff_delay(attempt);
                tracing::debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
                last_error = Some(err);
                tokio::time::sleep(delay).await;
            }
        }
    }

    // Unreachable: the loop always returns on the final attempt.
    Err(last_error.unwrap_or_else(|| DbError::Unknown("retry budget exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient_failure() -> sqlx::Error {
        sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ))
    }

    #[test]
    fn backoff_schedule_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(4), Duration::from_millis(5000));
        assert_eq!(backoff_delay(10), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn success_short_circuits() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(2, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, sqlx::Error>(vec![1, 2, 3]) }
        })
        .await;

        assert_eq!(result.unwrap(), vec![1, 2, 3]);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(2, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient_failure())
                } else {
                    Ok("rows")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "rows");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_propagates_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), DbError> = execute_with_retry(2, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(transient_failure()) }
        })
        .await;

        // max_retries = 2 means exactly 3 attempts.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(DbError::ConnectionLost)));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_slept_between_attempts() {
        let start = tokio::time::Instant::now();

        let _: Result<(), DbError> = execute_with_retry(3, || async {
            Err(transient_failure())
        })
        .await;

        // Failed attempts 1..3 sleep 1000 + 2000 + 4000 ms; the final
        // attempt fails without sleeping.
        assert_eq!(start.elapsed(), Duration::from_millis(7000));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_are_retried_too() {
        // The executor deliberately retries everything, even failures the
        // classifier marks non-transient.
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), DbError> = execute_with_retry(1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Err(sqlx::Error::Protocol("malformed query".to_string()))
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(DbError::Unknown(_))));
    }
}
