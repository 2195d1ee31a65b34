use metrics::counter;
use tracing::debug;

use crate::concurrency::queue::{QueueRx, QueueTx, drain, push};
use crate::error::SignerResult;
use crate::failpoints::{COMBINE__BEFORE_EMIT, signer_fail_point};
use crate::metrics::{SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL};
use crate::stages::base::Stage;

/// Name of the combine stage.
pub const COMBINE_STAGE: &str = "combine";

/// Separator placed between sorted hashes.
pub const COMBINE_SEPARATOR: &str = "_";

/// Sorts `hashes` lexicographically and joins them with [`COMBINE_SEPARATOR`].
///
/// The result does not depend on the order of `hashes`.
pub fn combine(mut hashes: Vec<String>) -> String {
    hashes.sort_unstable();
    hashes.join(COMBINE_SEPARATOR)
}

/// Stage reducing the whole input stream to a single canonical string.
///
/// This is the only ordering point of the pipeline: whatever order the upstream stages
/// produced, the emitted item is the same. Exactly one item is emitted, even for an empty
/// input.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombineStage;

impl CombineStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for CombineStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &'static str {
        COMBINE_STAGE
    }

    async fn run(self, mut input: QueueRx<String>, output: QueueTx<String>) -> SignerResult<()> {
        let hashes = drain(&mut input).await;
        let items = hashes.len();

        let combined = combine(hashes);
        debug!(stage = COMBINE_STAGE, items, "combined hashes");

        signer_fail_point(COMBINE__BEFORE_EMIT)?;
        push(&output, combined)?;
        counter!(SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL => COMBINE_STAGE).increment(1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::stage::run_stage;
    use rand::seq::SliceRandom;

    fn hashes() -> Vec<String> {
        ["b2", "a10", "a1", "c", "", "a1", "B"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn combine_sorts_bytewise() {
        assert_eq!(combine(hashes()), "_B_a1_a1_a10_b2_c");
    }

    #[test]
    fn combine_is_invariant_under_permutation() {
        let expected = combine(hashes());

        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let mut shuffled = hashes();
            shuffled.shuffle(&mut rng);
            assert_eq!(combine(shuffled), expected);
        }
    }

    #[tokio::test]
    async fn stage_emits_exactly_one_item() {
        let outputs = run_stage(CombineStage::new(), hashes()).await.unwrap();

        assert_eq!(outputs, vec!["_B_a1_a1_a10_b2_c".to_string()]);
    }

    #[tokio::test]
    async fn stage_emits_empty_string_for_empty_input() {
        let outputs = run_stage(CombineStage::new(), vec![]).await.unwrap();

        assert_eq!(outputs, vec![String::new()]);
    }

    #[tokio::test]
    async fn stage_output_is_invariant_under_permutation() {
        let expected = run_stage(CombineStage::new(), hashes()).await.unwrap();

        let mut shuffled = hashes();
        shuffled.reverse();
        assert_eq!(run_stage(CombineStage::new(), shuffled).await.unwrap(), expected);
    }
}
