use std::sync::Arc;

use metrics::counter;
use tracing::{debug, trace};

use crate::bail;
use crate::concurrency::barrier::TaskBarrier;
use crate::concurrency::guard::ResourceGuard;
use crate::concurrency::queue::{QueueRx, QueueTx, push};
use crate::error::{ErrorKind, SignerResult};
use crate::failpoints::{FIRST_HASH__AFTER_EXPENSIVE, signer_fail_point};
use crate::metrics::{SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL};
use crate::primitive::Signer;
use crate::stages::base::Stage;

/// Name of the first-hash stage.
pub const FIRST_HASH_STAGE: &str = "first_hash";

/// Separator between the two branches of a first hash.
pub const FIRST_HASH_SEPARATOR: &str = "~";

/// Stage turning integers into `cheap(x) ~ cheap(expensive(x))`.
///
/// Every input item gets its own task, and inside it the two branches run as two further
/// tasks. The expensive call is made under the [`ResourceGuard`]; the cheap branch never
/// waits for it. Output order follows task completion, not input order.
#[derive(Debug)]
pub struct FirstHashStage<S> {
    signer: Arc<S>,
    guard: ResourceGuard,
}

impl<S> FirstHashStage<S>
where
    S: Signer,
{
    /// Creates the stage around a shared signer and the guard protecting its expensive hash.
    pub fn new(signer: Arc<S>, guard: ResourceGuard) -> Self {
        Self { signer, guard }
    }
}

/// Result of one first-hash branch.
#[derive(Debug)]
enum Branch {
    Cheap(String),
    Expensive(String),
}

/// Computes the first hash of `value`.
///
/// The cheap branch and the guarded expensive branch are spawned into a [`TaskBarrier`] owned
/// by the caller, so cancelling the caller cancels both branches. Both are awaited even if one
/// of them fails.
pub async fn first_hash<S>(signer: Arc<S>, guard: ResourceGuard, value: i64) -> SignerResult<String>
where
    S: Signer,
{
    let data = value.to_string();
    let mut branches = TaskBarrier::new(FIRST_HASH_STAGE);

    branches.spawn({
        let signer = signer.clone();
        let data = data.clone();
        async move { Ok(Branch::Cheap(signer.cheap_hash(&data).await)) }
    });

    branches.spawn(async move {
        let digest = guard.guarded(signer.expensive_hash(&data)).await?;
        signer_fail_point(FIRST_HASH__AFTER_EXPENSIVE)?;

        Ok(Branch::Expensive(signer.cheap_hash(&digest).await))
    });

    let mut cheap = None;
    let mut expensive = None;
    for branch in branches.wait().await? {
        match branch {
            Branch::Cheap(hash) => cheap = Some(hash),
            Branch::Expensive(hash) => expensive = Some(hash),
        }
    }

    let (Some(cheap), Some(expensive)) = (cheap, expensive) else {
        bail!(
            ErrorKind::InvalidState,
            "First hash branch produced no result",
            format!("Value {value} is missing a branch result")
        );
    };

    Ok(format!("{cheap}{FIRST_HASH_SEPARATOR}{expensive}"))
}

impl<S> Stage for FirstHashStage<S>
where
    S: Signer,
{
    type Input = i64;
    type Output = String;

    fn name(&self) -> &'static str {
        FIRST_HASH_STAGE
    }

    async fn run(self, mut input: QueueRx<i64>, output: QueueTx<String>) -> SignerResult<()> {
        let mut barrier = TaskBarrier::new(FIRST_HASH_STAGE);

        while let Some(value) = input.recv().await {
            let signer = self.signer.clone();
            let guard = self.guard.clone();
            let output = output.clone();

            barrier.spawn(async move {
                let hash = first_hash(signer, guard, value).await?;
                trace!(value, %hash, "first hash computed");

                push(&output, hash)?;
                counter!(SIGNER_STAGE_ITEMS_TOTAL, STAGE_LABEL => FIRST_HASH_STAGE).increment(1);

                Ok(())
            });
        }

        debug!(
            stage = FIRST_HASH_STAGE,
            items = barrier.spawned(),
            "input closed, waiting for item tasks"
        );

        // The output queue must stay open until every item task has pushed its result.
        barrier.wait().await?;

        Ok(())
    }
}
