//! Metrics definitions for signing pipeline monitoring.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for pipeline ID in metrics.
pub const PIPELINE_ID_LABEL: &str = "pipeline_id";

/// Label for stage name in metrics.
pub const STAGE_LABEL: &str = "stage";

/// Counter for items emitted by a stage onto its output queue.
pub const SIGNER_STAGE_ITEMS_TOTAL: &str = "signer_stage_items_total";

/// Counter for stage tasks that terminated with an error or panic.
pub const SIGNER_STAGE_FAILURES_TOTAL: &str = "signer_stage_failures_total";

/// Histogram for time spent waiting on the expensive resource guard.
pub const SIGNER_RESOURCE_WAIT_SECONDS: &str = "signer_resource_wait_seconds";

/// Histogram for the wall-clock duration of a pipeline run.
pub const SIGNER_PIPELINE_DURATION_SECONDS: &str = "signer_pipeline_duration_seconds";

/// Registers metric descriptions. Safe to call multiple times.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            SIGNER_STAGE_ITEMS_TOTAL,
            Unit::Count,
            "Items emitted by a pipeline stage"
        );

        describe_counter!(
            SIGNER_STAGE_FAILURES_TOTAL,
            Unit::Count,
            "Pipeline stages that terminated with an error"
        );

        describe_histogram!(
            SIGNER_RESOURCE_WAIT_SECONDS,
            Unit::Seconds,
            "Time spent waiting for exclusive access to the expensive signer"
        );

        describe_histogram!(
            SIGNER_PIPELINE_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of a complete pipeline run"
        );
    });
}
