//! Testing utilities for signing pipelines.
//!
//! Enabled in unit tests and, for integration tests and dependent crates, through the
//! `test-utils` feature.
//!
//! - [`signer`] provides deterministic signers and wrappers adding jitter, instrumentation or
//!   injected failures to any [`Signer`](crate::primitive::Signer).
//! - [`stage`] provides small generic stages and a helper running a single stage in isolation.
//! - [`notify`] provides a timeout wrapper so that a hanging pipeline fails the test instead of
//!   blocking it.

pub mod notify;
pub mod signer;
pub mod stage;
