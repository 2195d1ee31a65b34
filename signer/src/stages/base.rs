use std::future::Future;

use crate::concurrency::queue::{QueueRx, QueueTx};
use crate::error::SignerResult;

/// A unit of work in a pipeline.
///
/// [`Stage`] consumes items of type [`Stage::Input`] from its input queue until that queue is
/// closed and drained, and produces items of type [`Stage::Output`] onto its output queue.
/// Implementations are free to parallelize per-item work internally.
///
/// # Completion contract
///
/// The future returned by [`Stage::run`] must only resolve after every piece of work it
/// launched has finished writing. The output queue closes when the last [`QueueTx`] clone is
/// dropped, so resolving early (or leaking a sender into a detached task) would let the
/// downstream stage observe a truncated stream or never terminate.
///
/// Typed boundaries make it impossible to connect a stage to an upstream stage producing a
/// different item shape.
pub trait Stage: Send + 'static {
    /// Item type read from the input queue.
    type Input: Send + 'static;

    /// Item type written to the output queue.
    type Output: Send + 'static;

    /// Returns the name of the stage, used for logging and metrics.
    fn name(&self) -> &'static str;

    /// Runs the stage to completion.
    ///
    /// The stage is consumed: it runs exactly once.
    fn run(
        self,
        input: QueueRx<Self::Input>,
        output: QueueTx<Self::Output>,
    ) -> impl Future<Output = SignerResult<()>> + Send;
}
