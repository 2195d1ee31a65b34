//! The three-stage signing pipeline.
//!
//! `first_hash -> multi_hash -> combine`, sharing one signer and one resource guard.

use std::sync::Arc;

use tracing::info;

use crate::bail;
use crate::concurrency::guard::ResourceGuard;
use crate::error::{ErrorKind, SignerResult};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineId};
use crate::primitive::Signer;
use crate::stages::{CombineStage, FirstHashStage, MultiHashStage};

/// Builds the signing pipeline over `signer`.
///
/// `guard` serializes every expensive hash issued by the first-hash stage.
pub fn signing_pipeline<S>(
    id: PipelineId,
    signer: Arc<S>,
    guard: ResourceGuard,
) -> Pipeline<i64, String>
where
    S: Signer,
{
    PipelineBuilder::new(id)
        .stage(FirstHashStage::new(signer.clone(), guard))
        .stage(MultiHashStage::new(signer))
        .stage(CombineStage::new())
        .build()
}

/// Signs `values` and returns the combined signature.
pub async fn sign_values<S, V>(
    id: PipelineId,
    signer: Arc<S>,
    guard: ResourceGuard,
    values: V,
) -> SignerResult<String>
where
    S: Signer,
    V: IntoIterator<Item = i64>,
{
    info!(
        pipeline_id = id,
        signer = S::name(),
        exclusive = guard.is_exclusive(),
        "signing values"
    );

    let mut outputs = signing_pipeline(id, signer, guard).run(values).await?;
    if outputs.len() != 1 {
        bail!(
            ErrorKind::InvalidState,
            "Signing pipeline must produce exactly one result",
            format!("Got {} results", outputs.len())
        );
    }

    match outputs.pop() {
        Some(signature) => Ok(signature),
        None => bail!(ErrorKind::InvalidState, "Signing pipeline produced no result"),
    }
}
