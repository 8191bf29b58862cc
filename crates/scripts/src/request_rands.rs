//! Request random numbers from the requester contract and print them.

use clap::Parser;
use qrng_scripts::{cli::RequestOpts, run_script};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = match qrng_tracing::init_logging() {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, cancelling");
            on_ctrl_c.cancel();
        }
    });

    run_script(RequestOpts::parse().run(cancel)).await
}
