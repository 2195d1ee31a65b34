//! Signer driver binary.
//!
//! Loads configuration, signs the configured (or command-line) inputs with the checksum signer
//! and prints the combined signature on stdout.

use std::process::ExitCode;

use clap::Parser;
use signer_config::Environment;
use signer_config::shared::DriverConfig;
use signer_telemetry::metrics::init_metrics_handle;
use signer_telemetry::tracing::{LogFormat, init_tracing};
use tracing::{debug, error};

use crate::config::load_driver_config;
use crate::core::run_with_config;
use crate::error::{DriverError, DriverResult};

mod config;
mod core;
mod error;

/// Signs a list of integers through the concurrent hashing pipeline.
#[derive(Parser, Debug)]
#[command(name = "signer-driver")]
#[command(about = "Signs a list of integers through the concurrent hashing pipeline")]
struct Args {
    /// Value to sign. Repeat to sign several values; overrides `pipeline.inputs`.
    #[arg(long = "input", allow_negative_numbers = true)]
    inputs: Vec<i64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match try_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn try_main(args: Args) -> DriverResult<()> {
    let mut driver_config = load_driver_config()?;
    if !args.inputs.is_empty() {
        driver_config.pipeline.inputs = args.inputs;
    }

    let environment = Environment::load().map_err(DriverError::config)?;
    let log_format = if environment.is_prod() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(env!("CARGO_BIN_NAME"), log_format).map_err(DriverError::config)?;

    let signature = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(driver_config))?;

    println!("{signature}");

    Ok(())
}

async fn async_main(driver_config: DriverConfig) -> DriverResult<String> {
    let metrics_handle = init_metrics_handle().map_err(DriverError::config)?;

    let result = run_with_config(&driver_config).await;
    if let Err(err) = &result {
        error!("{err}");
    }

    debug!(metrics = %metrics_handle.render(), "metrics snapshot");

    result
}
