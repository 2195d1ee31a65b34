//! Hash primitives consumed by the signing stages.

pub mod base;
pub mod checksum;

pub use base::Signer;
pub use checksum::ChecksumSigner;
