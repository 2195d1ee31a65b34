//! Logging and metrics setup shared by the signer driver and test suites.

pub mod metrics;
pub mod tracing;
