use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{SignerError, SignerResult};

/// Completion barrier over a set of spawned tasks.
///
/// [`TaskBarrier`] owns every task spawned through it. [`TaskBarrier::wait`] resolves once
/// exactly the tasks spawned so far have finished; no task can be added after waiting starts
/// because waiting consumes the barrier.
///
/// Failures do not short-circuit the wait. Every task is joined, so nothing spawned through the
/// barrier is still running (and still holding a queue sender) when `wait` returns.
#[derive(Debug)]
pub struct TaskBarrier<T> {
    name: &'static str,
    join_set: JoinSet<SignerResult<T>>,
    spawned: usize,
}

impl<T> TaskBarrier<T>
where
    T: Send + 'static,
{
    /// Creates an empty barrier labelled `name` for logging.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            join_set: JoinSet::new(),
            spawned: 0,
        }
    }

    /// Spawns `future` as a new task covered by this barrier.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = SignerResult<T>> + Send + 'static,
    {
        self.join_set.spawn(future);
        self.spawned += 1;
    }

    /// Returns how many tasks were spawned through this barrier.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Waits for every spawned task and returns their outputs in completion order.
    ///
    /// If any task failed or panicked, the collected errors are returned instead, aggregated
    /// into a single [`SignerError`].
    pub async fn wait(mut self) -> SignerResult<Vec<T>> {
        let mut outputs = Vec::with_capacity(self.spawned);
        let mut errors: Vec<SignerError> = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(err)) => {
                    error!(barrier = self.name, error = %err, "task completed with error");
                    errors.push(err);
                }
                Err(join_err) => {
                    error!(barrier = self.name, error = %join_err, "task did not complete");
                    errors.push(join_err.into());
                }
            }
        }

        debug!(
            barrier = self.name,
            spawned = self.spawned,
            failed = errors.len(),
            "barrier released"
        );

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(outputs)
    }
}
