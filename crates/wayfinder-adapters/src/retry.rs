//! Provider-owned retry loop.
//!
//! Transient failures (connection errors, timeouts, 429 and 5xx) are retried
//! with a linear backoff; anything else returns immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

/// Run `op` up to `max_retries + 1` times.
pub(crate) async fn with_retries<T, F, Fut>(
    provider: &str,
    max_retries: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(backoff * attempt).await;
            debug!(provider, attempt, "retrying provider call");
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                warn!(provider, attempt, error = %e, "provider attempt failed");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::ProviderError;

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retries("test", 2, Duration::from_millis(1), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::RequestFailed {
                    provider: "test".into(),
                    reason: "connection reset".into(),
                })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retries("test", 3, Duration::from_millis(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::LocationNotFound {
                location: "Nowhere".into(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retries("test", 1, Duration::from_millis(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::BadStatus {
                provider: "test".into(),
                status: 503,
            })
        })
        .await;

        assert!(matches!(result, Err(ProviderError::BadStatus { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
