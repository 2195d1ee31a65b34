use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::bail;
use crate::error::{ErrorKind, SignerResult};
use crate::primitive::Signer;

/// Deterministic signer with trivially checkable output.
///
/// - `cheap_hash(s)` is `s` reversed.
/// - `expensive_hash(s)` is `s` followed by `!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubSigner;

impl Signer for StubSigner {
    fn name() -> &'static str {
        "stub"
    }

    async fn cheap_hash(&self, data: &str) -> String {
        data.chars().rev().collect()
    }

    async fn expensive_hash(&self, data: &str) -> SignerResult<String> {
        Ok(format!("{data}!"))
    }
}

/// Wraps a signer and sleeps for a random duration before every call.
///
/// Used to shuffle task completion order without changing results.
#[derive(Debug)]
pub struct JitterSigner<S> {
    inner: S,
    max_jitter: Duration,
}

impl<S> JitterSigner<S> {
    pub fn new(inner: S, max_jitter: Duration) -> Self {
        Self { inner, max_jitter }
    }

    async fn jitter(&self) {
        let max_micros = self.max_jitter.as_micros() as u64;
        if max_micros == 0 {
            return;
        }

        let micros = rand::thread_rng().gen_range(0..=max_micros);
        tokio::time::sleep(Duration::from_micros(micros)).await;
    }
}

impl<S> Signer for JitterSigner<S>
where
    S: Signer,
{
    fn name() -> &'static str {
        "jitter"
    }

    async fn cheap_hash(&self, data: &str) -> String {
        self.jitter().await;
        self.inner.cheap_hash(data).await
    }

    async fn expensive_hash(&self, data: &str) -> SignerResult<String> {
        self.jitter().await;
        self.inner.expensive_hash(data).await
    }
}

/// Wraps a signer and records how expensive calls overlap.
///
/// Every expensive call holds for `hold` before delegating, so overlapping calls are
/// observable even on fast machines.
#[derive(Debug)]
pub struct InstrumentedSigner<S> {
    inner: S,
    hold: Duration,
    expensive_calls: AtomicUsize,
    active_expensive: AtomicUsize,
    max_concurrent_expensive: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S> InstrumentedSigner<S> {
    pub fn new(inner: S, hold: Duration) -> Self {
        Self {
            inner,
            hold,
            expensive_calls: AtomicUsize::new(0),
            active_expensive: AtomicUsize::new(0),
            max_concurrent_expensive: AtomicUsize::new(0),
        }
    }

    /// Returns how many expensive calls were made.
    pub fn expensive_calls(&self) -> usize {
        self.expensive_calls.load(Ordering::SeqCst)
    }

    /// Returns the highest number of expensive calls observed in flight at once.
    pub fn max_concurrent_expensive(&self) -> usize {
        self.max_concurrent_expensive.load(Ordering::SeqCst)
    }
}

impl<S> Signer for InstrumentedSigner<S>
where
    S: Signer,
{
    fn name() -> &'static str {
        "instrumented"
    }

    async fn cheap_hash(&self, data: &str) -> String {
        self.inner.cheap_hash(data).await
    }

    async fn expensive_hash(&self, data: &str) -> SignerResult<String> {
        self.expensive_calls.fetch_add(1, Ordering::SeqCst);

        let active = self.active_expensive.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveGuard(&self.active_expensive);
        self.max_concurrent_expensive
            .fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;

        self.inner.expensive_hash(data).await
    }
}

/// Wraps a signer and fails the expensive hash for one specific input.
#[derive(Debug)]
pub struct FailingSigner<S> {
    inner: S,
    fail_on: String,
}

impl<S> FailingSigner<S> {
    pub fn new(inner: S, fail_on: &str) -> Self {
        Self {
            inner,
            fail_on: fail_on.to_string(),
        }
    }
}

impl<S> Signer for FailingSigner<S>
where
    S: Signer,
{
    fn name() -> &'static str {
        "failing"
    }

    async fn cheap_hash(&self, data: &str) -> String {
        self.inner.cheap_hash(data).await
    }

    async fn expensive_hash(&self, data: &str) -> SignerResult<String> {
        if data == self.fail_on {
            bail!(
                ErrorKind::SignerFailed,
                "Expensive hash rejected the input",
                format!("Input '{data}' is configured to fail")
            );
        }

        self.inner.expensive_hash(data).await
    }
}
