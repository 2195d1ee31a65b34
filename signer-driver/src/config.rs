use signer_config::load_config;
use signer_config::shared::DriverConfig;

use crate::error::{DriverError, DriverResult};

/// Loads and validates the driver configuration.
pub fn load_driver_config() -> DriverResult<DriverConfig> {
    let config = load_config::<DriverConfig>().map_err(DriverError::config)?;
    config.validate().map_err(DriverError::config)?;

    Ok(config)
}
