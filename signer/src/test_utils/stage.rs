use std::marker::PhantomData;

use crate::concurrency::queue::{QueueRx, QueueTx, push};
use crate::error::{ErrorKind, SignerResult};
use crate::pipeline::PipelineBuilder;
use crate::signer_error;
use crate::stages::base::Stage;

/// Runs `stage` alone over `inputs` and returns everything it emitted.
pub async fn run_stage<S>(stage: S, inputs: Vec<S::Input>) -> SignerResult<Vec<S::Output>>
where
    S: Stage,
{
    PipelineBuilder::new(0).stage(stage).build().run(inputs).await
}

/// Stage applying a synchronous function to every item, in input order.
pub struct MapStage<I, O, F> {
    name: &'static str,
    map: F,
    phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F> MapStage<I, O, F>
where
    F: Fn(I) -> O,
{
    pub fn new(name: &'static str, map: F) -> Self {
        Self {
            name,
            map,
            phantom: PhantomData,
        }
    }
}

impl<I, O, F> Stage for MapStage<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(self, mut input: QueueRx<I>, output: QueueTx<O>) -> SignerResult<()> {
        while let Some(item) = input.recv().await {
            push(&output, (self.map)(item))?;
        }

        Ok(())
    }
}

/// How a [`FailingStage`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Return an [`ErrorKind::SignerFailed`] error.
    Error,
    /// Panic inside the stage task.
    Panic,
}

/// Pass-through stage that fails after forwarding a fixed number of items.
///
/// The failure happens while the input queue is still open, so upstream producers may still be
/// pushing and downstream consumers are still waiting.
#[derive(Debug)]
pub struct FailingStage<T> {
    forward: usize,
    mode: FailureMode,
    phantom: PhantomData<fn(T) -> T>,
}

impl<T> FailingStage<T> {
    pub fn new(forward: usize, mode: FailureMode) -> Self {
        Self {
            forward,
            mode,
            phantom: PhantomData,
        }
    }
}

impl<T> Stage for FailingStage<T>
where
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    fn name(&self) -> &'static str {
        "failing"
    }

    async fn run(self, mut input: QueueRx<T>, output: QueueTx<T>) -> SignerResult<()> {
        let mut forwarded = 0;
        while let Some(item) = input.recv().await {
            if forwarded == self.forward {
                match self.mode {
                    FailureMode::Error => {
                        return Err(signer_error!(
                            ErrorKind::SignerFailed,
                            "Injected stage failure",
                            format!("Failed after forwarding {forwarded} items")
                        ));
                    }
                    FailureMode::Panic => panic!("failing stage panicked after {forwarded} items"),
                }
            }

            push(&output, item)?;
            forwarded += 1;
        }

        Ok(())
    }
}
