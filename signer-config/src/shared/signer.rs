use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Simulated latencies of the checksum signer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SignerConfig {
    /// Latency, in milliseconds, of every cheap hash call.
    #[serde(default = "default_cheap_latency_ms")]
    pub cheap_latency_ms: u64,
    /// Latency, in milliseconds, of every expensive hash call.
    #[serde(default = "default_expensive_latency_ms")]
    pub expensive_latency_ms: u64,
}

impl SignerConfig {
    pub const DEFAULT_CHEAP_LATENCY_MS: u64 = 1000;

    pub const DEFAULT_EXPENSIVE_LATENCY_MS: u64 = 10;

    /// Upper bound for both latencies.
    pub const MAX_LATENCY_MS: u64 = 60_000;

    /// Ensures both latencies are at most [`SignerConfig::MAX_LATENCY_MS`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let latencies = [
            ("signer.cheap_latency_ms", self.cheap_latency_ms),
            ("signer.expensive_latency_ms", self.expensive_latency_ms),
        ];

        for (field, value) in latencies {
            if value > Self::MAX_LATENCY_MS {
                return Err(ValidationError::InvalidFieldValue {
                    field: field.to_string(),
                    constraint: format!("must be at most {}", Self::MAX_LATENCY_MS),
                });
            }
        }

        Ok(())
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            cheap_latency_ms: default_cheap_latency_ms(),
            expensive_latency_ms: default_expensive_latency_ms(),
        }
    }
}

fn default_cheap_latency_ms() -> u64 {
    SignerConfig::DEFAULT_CHEAP_LATENCY_MS
}

fn default_expensive_latency_ms() -> u64 {
    SignerConfig::DEFAULT_EXPENSIVE_LATENCY_MS
}
