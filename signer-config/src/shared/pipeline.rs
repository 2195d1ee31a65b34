use serde::{Deserialize, Serialize};

/// Configuration of a signing pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Identifier attached to logs and metrics of the run.
    pub id: u64,
    /// Values fed into the pipeline, in order.
    #[serde(default)]
    pub inputs: Vec<i64>,
}
