use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::bail;
use crate::concurrency::barrier::TaskBarrier;
use crate::concurrency::queue::{QueueRx, QueueTx, push};
use crate::error::{ErrorKind, SignerResult};
use crate::failpoints::{MULTI_HASH__BEFORE_EMIT, signer_fail_point};
use crate::metrics::{SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL};
use crate::primitive::Signer;
use crate::stages::base::Stage;

/// Name of the multi-hash stage.
pub const MULTI_HASH_STAGE: &str = "multi_hash";

/// Number of salted hashes computed per item.
pub const MULTI_HASH_FAN_OUT: usize = 6;

/// Stage turning each string `s` into `cheap("0" + s) + ... + cheap("5" + s)`.
///
/// Each item is processed by its own task, which fans out into [`MULTI_HASH_FAN_OUT`] hash
/// tasks. The concatenation is always in index order regardless of which hash finishes first.
/// Output order between different items is unspecified.
#[derive(Debug)]
pub struct MultiHashStage<S> {
    signer: Arc<S>,
}

impl<S> MultiHashStage<S>
where
    S: Signer,
{
    /// Creates the stage around a shared signer.
    pub fn new(signer: Arc<S>) -> Self {
        Self { signer }
    }
}

/// Per-item fan-out state.
///
/// Owns index-addressed result slots and the barrier over the tasks filling them. A fresh
/// context is built for every item, so no state is shared between items.
#[derive(Debug)]
struct MultiHashContext {
    slots: Arc<Mutex<Vec<Option<String>>>>,
    barrier: TaskBarrier<()>,
}

impl MultiHashContext {
    fn new(width: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![None; width])),
            barrier: TaskBarrier::new(MULTI_HASH_STAGE),
        }
    }

    /// Spawns `future` and stores its output in slot `index` once it completes.
    fn spawn_slot<F>(&mut self, index: usize, future: F)
    where
        F: Future<Output = String> + Send + 'static,
    {
        let slots = self.slots.clone();
        self.barrier.spawn(async move {
            let hash = future.await;

            let mut slots = slots.lock().await;
            let Some(slot) = slots.get_mut(index) else {
                bail!(
                    ErrorKind::InvalidState,
                    "Multi hash slot index out of range",
                    format!("Slot {index} does not exist")
                );
            };
            *slot = Some(hash);

            Ok(())
        });
    }

    /// Waits for every slot task and concatenates the slots in index order.
    async fn concatenate(self) -> SignerResult<String> {
        let MultiHashContext { slots, barrier } = self;
        barrier.wait().await?;

        let slots = slots.lock().await;
        let mut concatenated = String::new();
        for (index, slot) in slots.iter().enumerate() {
            let Some(hash) = slot else {
                bail!(
                    ErrorKind::InvalidState,
                    "Multi hash slot was never filled",
                    format!("Slot {index} is empty after all hash tasks completed")
                );
            };
            concatenated.push_str(hash);
        }

        Ok(concatenated)
    }
}

/// Computes the multi hash of `data`.
pub async fn multi_hash<S>(signer: Arc<S>, data: String) -> SignerResult<String>
where
    S: Signer,
{
    let mut context = MultiHashContext::new(MULTI_HASH_FAN_OUT);
    for index in 0..MULTI_HASH_FAN_OUT {
        let signer = signer.clone();
        let salted = format!("{index}{data}");
        context.spawn_slot(index, async move { signer.cheap_hash(&salted).await });
    }

    context.concatenate().await
}

impl<S> Stage for MultiHashStage<S>
where
    S: Signer,
{
    type Input = String;
    type Output = String;

    fn name(&self) -> &'static str {
        MULTI_HASH_STAGE
    }

    async fn run(self, mut input: QueueRx<String>, output: QueueTx<String>) -> SignerResult<()> {
        let mut barrier = TaskBarrier::new(MULTI_HASH_STAGE);

        while let Some(data) = input.recv().await {
            let signer = self.signer.clone();
            let output = output.clone();

            barrier.spawn(async move {
                let hash = multi_hash(signer, data).await?;
                trace!(%hash, "multi hash computed");

                signer_fail_point(MULTI_HASH__BEFORE_EMIT)?;
                push(&output, hash)?;
                counter!(SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL => MULTI_HASH_STAGE).increment(1);

                Ok(())
            });
        }

        debug!(
            stage = MULTI_HASH_STAGE,
            items = barrier.spawned(),
            "input closed, waiting for item tasks"
        );

        barrier.wait().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::ChecksumSigner;
    use crate::test_utils::signer::{JitterSigner, StubSigner};
    use crate::test_utils::stage::run_stage;
    use std::time::Duration;

    async fn sequential_multi_hash(data: &str) -> String {
        let mut expected = String::new();
        for index in 0..MULTI_HASH_FAN_OUT {
            expected.push_str(&StubSigner.cheap_hash(&format!("{index}{data}")).await);
        }

        expected
    }

    #[tokio::test]
    async fn multi_hash_concatenates_in_index_order() {
        let hash = multi_hash(Arc::new(StubSigner), "ab".to_string())
            .await
            .unwrap();

        assert_eq!(hash, "ba0ba1ba2ba3ba4ba5");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn index_order_survives_random_completion_order() {
        let signer = Arc::new(JitterSigner::new(StubSigner, Duration::from_millis(5)));

        for data in ["x", "hello", "12~!21"] {
            let expected = sequential_multi_hash(data).await;
            for _ in 0..10 {
                let hash = multi_hash(signer.clone(), data.to_string()).await.unwrap();
                assert_eq!(hash, expected);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn salted_hashes_run_concurrently() {
        let latency = Duration::from_millis(100);
        let signer = Arc::new(ChecksumSigner::new(latency, Duration::ZERO));

        let started = tokio::time::Instant::now();
        multi_hash(signer.clone(), "data".to_string()).await.unwrap();
        let elapsed = started.elapsed();

        // Six overlapping hashes take about one latency, not six.
        assert!(elapsed >= latency);
        assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");
        assert_eq!(signer.cheap_calls(), MULTI_HASH_FAN_OUT as u64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stage_emits_one_hash_per_item() {
        let signer = Arc::new(JitterSigner::new(StubSigner, Duration::from_millis(2)));
        let items: Vec<String> = (0..20).map(|i| format!("item{i}")).collect();

        let mut outputs = run_stage(MultiHashStage::new(signer), items.clone())
            .await
            .unwrap();
        outputs.sort();

        let mut expected = Vec::new();
        for item in &items {
            expected.push(sequential_multi_hash(item).await);
        }
        expected.sort();

        assert_eq!(outputs, expected);
    }

    #[tokio::test]
    async fn empty_context_concatenates_to_empty_string() {
        let context = MultiHashContext::new(0);

        assert_eq!(context.concatenate().await.unwrap(), "");
    }

    #[tokio::test]
    async fn unfilled_slot_is_invalid_state() {
        let mut context = MultiHashContext::new(2);
        context.spawn_slot(0, async { "only".to_string() });

        let err = context.concatenate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
