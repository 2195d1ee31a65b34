use std::future::Future;

use crate::error::SignerResult;

/// Pair of deterministic hash functions consumed by the signing stages.
///
/// [`Signer::cheap_hash`] may be called by any number of tasks at once.
/// [`Signer::expensive_hash`] models a rate-limited external service: callers must hold the
/// shared [`ResourceGuard`] for the duration of the call. The guard is not taken inside the
/// primitive.
///
/// Implementations are shared between tasks through an [`std::sync::Arc`] and must therefore
/// be thread-safe. Both functions must be pure in their result: the same input always yields
/// the same output.
///
/// [`ResourceGuard`]: crate::concurrency::guard::ResourceGuard
pub trait Signer: Send + Sync + 'static {
    /// Returns the name of the signer.
    fn name() -> &'static str;

    /// Computes the cheap, freely parallelizable hash of `data`.
    fn cheap_hash(&self, data: &str) -> impl Future<Output = String> + Send;

    /// Computes the expensive hash of `data`.
    ///
    /// Must be invoked under the shared resource guard. An implementation may report a
    /// concurrent invocation as [`ErrorKind::ResourceOverheated`].
    ///
    /// [`ErrorKind::ResourceOverheated`]: crate::error::ErrorKind::ResourceOverheated
    fn expensive_hash(&self, data: &str) -> impl Future<Output = SignerResult<String>> + Send;
}
