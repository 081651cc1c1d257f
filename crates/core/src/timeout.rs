//! Timed operation wrapper.
//!
//! Races an operation against a deadline. There is no cancellation: the
//! operation is spawned as its own task, and when the deadline wins the
//! task is detached and runs to completion in the background with its
//! result discarded. Callers that need true cancellation must build it
//! into the operation itself.

use std::future::Future;
use std::time::Duration;

use crate::error::DbError;

/// Run `operation` with a deadline.
///
/// Returns the operation's output if it settles first, or
/// [`DbError::DeadlineExceeded`] once `timeout` elapses. A panic in the
/// operation surfaces as [`DbError::Unknown`].
pub async fn with_timeout<F, T>(operation: F, timeout: Duration) -> Result<T, DbError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::spawn(operation);

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "timed operation task failed");
            Err(DbError::Unknown(format!("operation task failed: {join_err}")))
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "deadline elapsed; operation left running detached"
            );
            Err(DbError::DeadlineExceeded(timeout))
        }
    }
}
