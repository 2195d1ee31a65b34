//! Shared configuration types for the signer driver.

mod base;
mod driver;
mod pipeline;
mod signer;

pub use base::ValidationError;
pub use driver::DriverConfig;
pub use pipeline::PipelineConfig;
pub use signer::SignerConfig;
