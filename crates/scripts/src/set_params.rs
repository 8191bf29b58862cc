//! Set the airnode, endpoint id and sponsor wallet on the requester contract.

use clap::Parser;
use qrng_scripts::{cli::SetParamsOpts, run_script};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = match qrng_tracing::init_logging() {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    run_script(SetParamsOpts::parse().run()).await
}
