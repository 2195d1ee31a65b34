//! Concurrent multi-stage signing pipeline.
//!
//! A [`pipeline::Pipeline`] is an ordered chain of [`stages::Stage`]s connected by queues. Each
//! stage runs as its own task and parallelizes per-item work internally; a stage closes its
//! output queue only after all of its work has finished, so completion propagates down the
//! chain without sentinel values.
//!
//! [`signing::sign_values`] wires the three signing stages over a [`primitive::Signer`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use signer::concurrency::guard::ResourceGuard;
//! use signer::primitive::ChecksumSigner;
//! use signer::signing::sign_values;
//!
//! # async fn example() -> signer::error::SignerResult<()> {
//! let signature = sign_values(
//!     1,
//!     Arc::new(ChecksumSigner::default()),
//!     ResourceGuard::exclusive(),
//!     [0, 1, 1, 2, 3, 5, 8],
//! )
//! .await?;
//! println!("{signature}");
//! # Ok(())
//! # }
//! ```

pub mod concurrency;
pub mod error;
pub mod failpoints;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod primitive;
pub mod signing;
pub mod stages;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
