use std::future::Future;
use std::sync::Arc;

use metrics::histogram;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::trace;

use crate::metrics::SIGNER_RESOURCE_WAIT_SECONDS;

/// Mutual-exclusion capability for a scarce resource.
///
/// [`ResourceGuard`] is handed to every component that calls the expensive signing primitive.
/// All clones of an exclusive guard share one fair lock, so at most one holder exists at any
/// time across every clone. Waiters are served in FIFO order.
///
/// [`ResourceGuard::unguarded`] builds a guard that never blocks, for single-threaded tests or
/// for demonstrating what happens when the resource is not protected.
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    lock: Option<Arc<Mutex<()>>>,
}

/// Proof of exclusive access obtained from [`ResourceGuard::acquire`].
///
/// Access is released when the permit is dropped.
#[derive(Debug)]
pub struct ResourcePermit {
    _guard: Option<OwnedMutexGuard<()>>,
}

impl ResourceGuard {
    /// Creates a guard whose clones all share a single lock.
    pub fn exclusive() -> Self {
        Self {
            lock: Some(Arc::new(Mutex::new(()))),
        }
    }

    /// Creates a guard that grants access immediately to every caller.
    pub fn unguarded() -> Self {
        Self { lock: None }
    }

    /// Returns `true` when this guard serializes its holders.
    pub fn is_exclusive(&self) -> bool {
        self.lock.is_some()
    }

    /// Waits until access is granted.
    pub async fn acquire(&self) -> ResourcePermit {
        let Some(lock) = &self.lock else {
            return ResourcePermit { _guard: None };
        };

        let started = Instant::now();
        let guard = lock.clone().lock_owned().await;

        let waited = started.elapsed();
        histogram!(SIGNER_RESOURCE_WAIT_SECONDS).record(waited.as_secs_f64());
        trace!(waited_ms = waited.as_millis() as u64, "resource acquired");

        ResourcePermit {
            _guard: Some(guard),
        }
    }

    /// Runs `future` while holding access to the resource.
    pub async fn guarded<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        let _permit = self.acquire().await;
        future.await
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::exclusive()
    }
}
