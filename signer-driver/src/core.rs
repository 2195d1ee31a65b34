use std::sync::Arc;
use std::time::Duration;

use signer::concurrency::guard::ResourceGuard;
use signer::primitive::ChecksumSigner;
use signer::signing::sign_values;
use signer_config::shared::DriverConfig;
use tracing::info;

use crate::error::DriverResult;

/// Signs the configured inputs with a [`ChecksumSigner`] and returns the signature.
pub async fn run_with_config(config: &DriverConfig) -> DriverResult<String> {
    let signer = Arc::new(ChecksumSigner::new(
        Duration::from_millis(config.signer.cheap_latency_ms),
        Duration::from_millis(config.signer.expensive_latency_ms),
    ));

    info!(
        pipeline_id = config.pipeline.id,
        inputs = config.pipeline.inputs.len(),
        cheap_latency_ms = config.signer.cheap_latency_ms,
        expensive_latency_ms = config.signer.expensive_latency_ms,
        "starting signing run"
    );

    let signature = sign_values(
        config.pipeline.id,
        signer.clone(),
        ResourceGuard::exclusive(),
        config.pipeline.inputs.iter().copied(),
    )
    .await?;

    info!(
        pipeline_id = config.pipeline.id,
        cheap_calls = signer.cheap_calls(),
        expensive_calls = signer.expensive_calls(),
        "signing run completed"
    );

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signer_config::shared::{PipelineConfig, SignerConfig};

    fn config(inputs: Vec<i64>) -> DriverConfig {
        DriverConfig {
            pipeline: PipelineConfig { id: 1, inputs },
            signer: SignerConfig {
                cheap_latency_ms: 0,
                expensive_latency_ms: 0,
            },
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn signature_does_not_depend_on_input_order() {
        let forward = run_with_config(&config(vec![0, 1, 1, 2, 3, 5, 8])).await.unwrap();
        let backward = run_with_config(&config(vec![8, 5, 3, 2, 1, 1, 0])).await.unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.split('_').count(), 7);
    }

    #[tokio::test]
    async fn empty_input_signs_to_empty_string() {
        assert_eq!(run_with_config(&config(vec![])).await.unwrap(), "");
    }
}
