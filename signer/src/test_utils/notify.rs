use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Default bound for awaiting pipeline completion in tests.
///
/// Every pipeline in the test suite finishes well within a few seconds.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Awaits `future` with [`DEFAULT_COMPLETION_TIMEOUT`].
///
/// # Panics
///
/// Panics if the timeout elapses first.
pub async fn within_timeout<F>(future: F) -> F::Output
where
    F: Future,
{
    within(DEFAULT_COMPLETION_TIMEOUT, future).await
}

/// Awaits `future`, panicking if it does not resolve within `duration`.
pub async fn within<F>(duration: Duration, future: F) -> F::Output
where
    F: Future,
{
    match timeout(duration, future).await {
        Ok(output) => output,
        Err(_) => {
            panic!(
                "Test future did not complete after {duration:?}. \
                 This likely indicates a queue was never closed and a stage is still waiting \
                 for input."
            );
        }
    }
}
