use futures::future::BoxFuture;
use metrics::{counter, histogram};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bail;
use crate::concurrency::queue::{QueueRx, QueueTx, create_queue, drain, push};
use crate::error::{ErrorKind, SignerError, SignerResult};
use crate::metrics::{
    PIPELINE_ID_LABEL, SIGNER_PIPELINE_DURATION_SECONDS, SIGNER_STAGE_FAILURES_TOTAL, STAGE_LABEL,
    register_metrics,
};
use crate::stages::base::Stage;

pub type PipelineId = u64;

/// A stage bound to its input and output queues, ready to be spawned.
struct StageTask {
    index: usize,
    name: &'static str,
    future: BoxFuture<'static, SignerResult<()>>,
}

/// Typed builder chaining stages into a [`Pipeline`].
///
/// The builder starts with the external input queue. Every call to
/// [`PipelineBuilder::stage`] creates the next queue and binds the stage to read the current
/// tail and write the new one, so stage `i` reads queue `i` and writes queue `i + 1`. A stage
/// can only be appended if its input type matches the previous stage's output type.
pub struct PipelineBuilder<I, O> {
    id: PipelineId,
    input: QueueTx<I>,
    tail: QueueRx<O>,
    stages: Vec<StageTask>,
}

impl<I> PipelineBuilder<I, I>
where
    I: Send + 'static,
{
    /// Creates a builder with no stages.
    pub fn new(id: PipelineId) -> Self {
        let (input, tail) = create_queue();

        Self {
            id,
            input,
            tail,
            stages: Vec::new(),
        }
    }
}

impl<I, O> PipelineBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends `stage` to the chain.
    pub fn stage<S>(self, stage: S) -> PipelineBuilder<I, S::Output>
    where
        S: Stage<Input = O>,
    {
        let PipelineBuilder {
            id,
            input,
            tail,
            mut stages,
        } = self;

        let (output, next_tail) = create_queue();
        let index = stages.len();
        let name = stage.name();

        stages.push(StageTask {
            index,
            name,
            future: Box::pin(stage.run(tail, output)),
        });

        PipelineBuilder {
            id,
            input,
            tail: next_tail,
            stages,
        }
    }

    /// Finishes the chain.
    pub fn build(self) -> Pipeline<I, O> {
        Pipeline {
            id: self.id,
            input: self.input,
            output: self.tail,
            stages: self.stages,
        }
    }
}

/// An ordered chain of stages connected by queues.
///
/// Nothing runs until [`Pipeline::start`] or [`Pipeline::run`] is called.
pub struct Pipeline<I, O> {
    id: PipelineId,
    input: QueueTx<I>,
    output: QueueRx<O>,
    stages: Vec<StageTask>,
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// Returns the names of the stages in chain order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name).collect()
    }

    /// Spawns every stage as an independent task.
    pub fn start(self) -> PipelineHandle<I, O> {
        register_metrics();

        info!(
            pipeline_id = self.id,
            stages = self.stages.len(),
            "starting pipeline"
        );

        let mut join_set = JoinSet::new();
        for StageTask {
            index,
            name,
            future,
        } in self.stages
        {
            join_set.spawn(async move {
                debug!(stage = name, index, "stage started");
                let result = future.await;
                debug!(stage = name, index, ok = result.is_ok(), "stage finished");

                (index, name, result)
            });
        }

        PipelineHandle {
            id: self.id,
            input: Some(self.input),
            output: self.output,
            join_set,
            started: Instant::now(),
        }
    }

    /// Feeds `values` into the pipeline, closes the input and waits for the final output.
    pub async fn run<V>(self, values: V) -> SignerResult<Vec<O>>
    where
        V: IntoIterator<Item = I>,
    {
        let handle = self.start();

        let mut rejected = None;
        for value in values {
            if let Err(err) = handle.push(value) {
                warn!(
                    pipeline_id = handle.id,
                    error = %err,
                    "first stage stopped reading input"
                );
                rejected = Some(err);
                break;
            }
        }

        // A stage failure explains why the input was rejected, so it takes precedence.
        let items = handle.wait().await?;
        match rejected {
            Some(err) => Err(err),
            None => Ok(items),
        }
    }
}

/// Handle to a running [`Pipeline`].
///
/// Owns the external input queue sender and the terminal queue receiver.
pub struct PipelineHandle<I, O> {
    id: PipelineId,
    input: Option<QueueTx<I>>,
    output: QueueRx<O>,
    join_set: JoinSet<(usize, &'static str, SignerResult<()>)>,
    started: Instant,
}

impl<I, O> PipelineHandle<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// Pushes a value into the first stage.
    ///
    /// Fails with `QueueClosed` once the input has been closed or the first stage is gone.
    pub fn push(&self, value: I) -> SignerResult<()> {
        match &self.input {
            Some(input) => push(input, value),
            None => bail!(ErrorKind::QueueClosed, "Pipeline input already closed"),
        }
    }

    /// Closes the input queue. No further values can be pushed.
    pub fn close_input(&mut self) {
        if self.input.take().is_some() {
            debug!(pipeline_id = self.id, "pipeline input closed");
        }
    }

    /// Waits for every stage and returns the items left in the terminal queue.
    ///
    /// Closes the input first if the caller has not. If any stage fails or panics, all
    /// remaining stages are aborted, which drops their senders and closes every downstream
    /// queue, and the collected errors are returned. Partial output is never returned.
    pub async fn wait(mut self) -> SignerResult<Vec<O>> {
        self.close_input();

        let mut errors: Vec<SignerError> = Vec::new();
        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok((_, _, Ok(()))) => {}
                Ok((index, name, Err(err))) => {
                    error!(
                        pipeline_id = self.id,
                        stage = name,
                        index,
                        error = %err,
                        "stage failed, aborting remaining stages"
                    );
                    counter!(
                        SIGNER_STAGE_FAILURES_TOTAL,
                        PIPELINE_ID_LABEL => self.id.to_string(),
                        STAGE_LABEL => name,
                    )
                    .increment(1);

                    errors.push(err);
                    self.join_set.abort_all();
                }
                Err(join_err) if join_err.is_cancelled() => {
                    debug!(pipeline_id = self.id, "stage task was aborted");
                }
                Err(join_err) => {
                    error!(
                        pipeline_id = self.id,
                        error = %join_err,
                        "stage panicked, aborting remaining stages"
                    );

                    errors.push(join_err.into());
                    self.join_set.abort_all();
                }
            }
        }

        let elapsed = self.started.elapsed();
        histogram!(
            SIGNER_PIPELINE_DURATION_SECONDS,
            PIPELINE_ID_LABEL => self.id.to_string(),
        )
        .record(elapsed.as_secs_f64());

        if !errors.is_empty() {
            info!(
                pipeline_id = self.id,
                failed = errors.len(),
                "pipeline completed with errors"
            );

            return Err(errors.into());
        }

        let items = drain(&mut self.output).await;
        info!(
            pipeline_id = self.id,
            items = items.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "pipeline completed"
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::combine::CombineStage;
    use crate::test_utils::stage::{FailingStage, FailureMode, MapStage};
    use std::time::Duration;

    #[tokio::test]
    async fn pipeline_without_stages_forwards_input() {
        let pipeline = PipelineBuilder::<u32, u32>::new(1).build();

        assert!(pipeline.stage_names().is_empty());
        assert_eq!(pipeline.run([1, 2, 3]).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stages_are_chained_in_order() {
        let pipeline = PipelineBuilder::new(2)
            .stage(MapStage::new("double", |value: u32| value * 2))
            .stage(MapStage::new("render", |value: u32| value.to_string()))
            .stage(CombineStage::new())
            .build();

        assert_eq!(pipeline.stage_names(), vec!["double", "render", "combine"]);
        assert_eq!(pipeline.run(1..=5).await.unwrap(), vec!["10_2_4_6_8".to_string()]);
    }

    #[tokio::test]
    async fn handle_accepts_values_until_input_is_closed() {
        let mut handle = PipelineBuilder::new(3)
            .stage(MapStage::new("render", |value: u32| value.to_string()))
            .stage(CombineStage::new())
            .build()
            .start();

        handle.push(2).unwrap();
        handle.push(1).unwrap();
        handle.close_input();

        let err = handle.push(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);

        assert_eq!(handle.wait().await.unwrap(), vec!["1_2".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failing_stage_closes_downstream_and_reports_error() {
        let pipeline = PipelineBuilder::new(4)
            .stage(FailingStage::<u32>::new(2, FailureMode::Error))
            .stage(MapStage::new("render", |value: u32| value.to_string()))
            .stage(CombineStage::new())
            .build();

        let result = tokio::time::timeout(Duration::from_secs(10), pipeline.run(0..10))
            .await
            .expect("pipeline must terminate when a stage fails");

        let err = result.unwrap_err();
        assert!(err.kinds().contains(&ErrorKind::SignerFailed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_stage_closes_downstream_and_reports_error() {
        let pipeline = PipelineBuilder::new(5)
            .stage(MapStage::new("render", |value: u32| value.to_string()))
            .stage(FailingStage::<String>::new(1, FailureMode::Panic))
            .stage(CombineStage::new())
            .build();

        let result = tokio::time::timeout(Duration::from_secs(10), pipeline.run(0..10))
            .await
            .expect("pipeline must terminate when a stage panics");

        let err = result.unwrap_err();
        assert!(err.kinds().contains(&ErrorKind::TaskPanicked));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failure_in_last_stage_discards_partial_output() {
        let pipeline = PipelineBuilder::new(6)
            .stage(MapStage::new("render", |value: u32| value.to_string()))
            .stage(FailingStage::<String>::new(3, FailureMode::Error))
            .build();

        let err = pipeline.run(0..10).await.unwrap_err();
        assert!(err.kinds().contains(&ErrorKind::SignerFailed));
    }
}
