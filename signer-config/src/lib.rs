//! Configuration loading for the signer driver.
//!
//! Configuration is read from `configuration/base.*`, then `configuration/{environment}.*`, then
//! `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::{APP_ENVIRONMENT_ENV_NAME, Environment};
pub use load::{Config, LoadConfigError, load_config, load_config_from};
