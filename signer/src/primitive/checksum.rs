use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use md5::{Digest, Md5};
use tracing::{error, trace};

use crate::bail;
use crate::error::{ErrorKind, SignerResult};
use crate::primitive::base::Signer;

/// Default simulated latency of the cheap hash.
pub const DEFAULT_CHEAP_LATENCY: Duration = Duration::from_millis(1000);

/// Default simulated latency of the expensive hash.
pub const DEFAULT_EXPENSIVE_LATENCY: Duration = Duration::from_millis(10);

/// Production signer backed by real checksums.
///
/// - The cheap hash is the CRC-32 (IEEE) checksum of the input rendered in decimal.
/// - The expensive hash is the lowercase hex MD5 digest of the input.
///
/// Both calls sleep for a configurable latency first, simulating a remote service. The
/// expensive hash detects overlapping invocations and fails them with
/// [`ErrorKind::ResourceOverheated`], so a caller forgetting the resource guard is caught
/// instead of silently tolerated.
#[derive(Debug)]
pub struct ChecksumSigner {
    cheap_latency: Duration,
    expensive_latency: Duration,
    active_expensive: AtomicUsize,
    cheap_calls: AtomicU64,
    expensive_calls: AtomicU64,
}

/// Marks an expensive call as active until dropped.
///
/// Releasing on drop keeps the counter correct when the call future is cancelled mid-sleep.
struct ActiveCall<'a>(&'a AtomicUsize);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ChecksumSigner {
    /// Creates a signer with the given simulated latencies.
    pub fn new(cheap_latency: Duration, expensive_latency: Duration) -> Self {
        Self {
            cheap_latency,
            expensive_latency,
            active_expensive: AtomicUsize::new(0),
            cheap_calls: AtomicU64::new(0),
            expensive_calls: AtomicU64::new(0),
        }
    }

    /// Creates a signer that answers without simulated latency.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Returns how many cheap hashes were computed.
    pub fn cheap_calls(&self) -> u64 {
        self.cheap_calls.load(Ordering::Relaxed)
    }

    /// Returns how many expensive hashes were requested, including overheated ones.
    pub fn expensive_calls(&self) -> u64 {
        self.expensive_calls.load(Ordering::Relaxed)
    }
}

impl Default for ChecksumSigner {
    fn default() -> Self {
        Self::new(DEFAULT_CHEAP_LATENCY, DEFAULT_EXPENSIVE_LATENCY)
    }
}

impl Signer for ChecksumSigner {
    fn name() -> &'static str {
        "checksum"
    }

    async fn cheap_hash(&self, data: &str) -> String {
        self.cheap_calls.fetch_add(1, Ordering::Relaxed);
        if !self.cheap_latency.is_zero() {
            tokio::time::sleep(self.cheap_latency).await;
        }

        let checksum = crc32fast::hash(data.as_bytes());
        trace!(data, checksum, "computed cheap hash");

        checksum.to_string()
    }

    async fn expensive_hash(&self, data: &str) -> SignerResult<String> {
        self.expensive_calls.fetch_add(1, Ordering::Relaxed);

        let already_active = self.active_expensive.fetch_add(1, Ordering::AcqRel);
        let _active = ActiveCall(&self.active_expensive);
        if already_active > 0 {
            error!(
                data,
                concurrent = already_active + 1,
                "expensive signer invoked concurrently"
            );

            bail!(
                ErrorKind::ResourceOverheated,
                "Expensive signer invoked concurrently",
                format!(
                    "{} calls were active while hashing '{data}'",
                    already_active + 1
                )
            );
        }

        if !self.expensive_latency.is_zero() {
            tokio::time::sleep(self.expensive_latency).await;
        }

        let digest = hex::encode(Md5::digest(data.as_bytes()));
        trace!(data, %digest, "computed expensive hash");

        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::guard::ResourceGuard;
    use std::sync::Arc;

    #[tokio::test]
    async fn cheap_hash_is_decimal_crc32() {
        let signer = ChecksumSigner::instant();

        assert_eq!(signer.cheap_hash("0").await, "4108050209");
        assert_eq!(signer.cheap_hash("1").await, "2212294583");
        assert_eq!(signer.cheap_calls(), 2);
    }

    #[tokio::test]
    async fn expensive_hash_is_hex_md5() {
        let signer = ChecksumSigner::instant();

        assert_eq!(
            signer.expensive_hash("abc").await.unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(signer.expensive_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_expensive_calls_overheat() {
        let signer = Arc::new(ChecksumSigner::new(Duration::ZERO, Duration::from_millis(20)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let signer = signer.clone();
                let data = i.to_string();
                tokio::spawn(async move { signer.expensive_hash(&data).await })
            })
            .collect();

        let mut overheated = 0;
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                assert_eq!(err.kind(), ErrorKind::ResourceOverheated);
                overheated += 1;
            }
        }

        assert!(overheated > 0);
        assert_eq!(signer.active_expensive.load(Ordering::Acquire), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn guarded_expensive_calls_never_overheat() {
        let signer = Arc::new(ChecksumSigner::new(Duration::ZERO, Duration::from_millis(2)));
        let guard = ResourceGuard::exclusive();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let signer = signer.clone();
                let guard = guard.clone();
                let data = i.to_string();
                tokio::spawn(async move { guard.guarded(signer.expensive_hash(&data)).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn cancelled_call_releases_active_slot() {
        let signer = ChecksumSigner::new(Duration::ZERO, Duration::from_secs(60));

        let call = tokio::time::timeout(Duration::from_millis(5), signer.expensive_hash("x")).await;
        assert!(call.is_err());

        assert_eq!(signer.active_expensive.load(Ordering::Acquire), 0);
    }
}
