use std::{sync::Mutex, time::Duration};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::trace;

/// Interval between two upkeep runs of the Prometheus recorder.
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// Cache for the handle returned by [`init_metrics_handle`].
//
// Installing the recorder is fallible and can only succeed once per process, so a [`Mutex`]
// around an [`Option`] is used instead of a once cell.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the global Prometheus recorder and returns a handle for rendering.
///
/// Later calls return a clone of the cached handle. When called from within a Tokio runtime, a
/// background task periodically runs upkeep on the recorder.
pub fn init_metrics_handle() -> Result<PrometheusHandle, BuildError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        let upkeep_handle = handle.clone();
        runtime.spawn(async move {
            loop {
                tokio::time::sleep(UPKEEP_INTERVAL).await;
                trace!("running metrics upkeep");
                upkeep_handle.run_upkeep();
            }
        });
    }

    Ok(handle)
}
