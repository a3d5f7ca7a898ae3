//! Caller-supplied deadlines for individual API calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{Result, SyncError};

/// Awaits `future`, giving up after `limit` when one is set.
///
/// On expiry the future is dropped, which cancels any in-flight request.
/// A mutation that reached the server before the deadline may still have
/// been applied.
pub async fn within<F, T>(limit: Option<Duration>, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match limit {
        Some(limit) => timeout(limit, future)
            .await
            .map_err(|_| SyncError::DeadlineExceeded(operation.to_string())),
        None => Ok(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::within;
    use crate::error::SyncError;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn returns_output_when_future_finishes_in_time() {
        let value = within(Some(Duration::from_secs(1)), "quick", async { 7 }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn no_limit_waits_for_completion() {
        let value = within(None, "unbounded", async {
            sleep(Duration::from_millis(5)).await;
            "done"
        })
        .await;
        assert_eq!(value.unwrap(), "done");
    }

    #[tokio::test]
    async fn expired_deadline_names_the_operation() {
        let result = within(Some(Duration::from_millis(10)), "get_worklogs", async {
            sleep(Duration::from_millis(200)).await;
        })
        .await;
        assert!(matches!(result, Err(SyncError::DeadlineExceeded(op)) if op == "get_worklogs"));
    }
}
