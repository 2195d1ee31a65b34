use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{PipelineConfig, SignerConfig, ValidationError};

/// Complete configuration of the signer driver.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub signer: SignerConfig,
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.signer.validate()
    }
}

impl Config for DriverConfig {
    const ENV_LIST_KEYS: &'static [&'static str] = &["pipeline.inputs"];
}
