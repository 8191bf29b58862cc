//! Derive the sponsor wallet of the requester contract and fund it.

use clap::Parser;
use qrng_scripts::{cli::FundOpts, run_script};
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

    run_script(FundOpts::parse().run()).await
}
