//! Scripts for working with an API3 QRNG requester contract: funding its sponsor wallet, setting
//! its request parameters and requesting random numbers.

pub mod callback;
pub mod cli;
pub mod config;
pub mod fund;
pub mod params;
pub mod request;
pub mod tx;

use std::{future::Future, process::ExitCode};

/// Await a script and map its result to the process exit code, printing the error on failure.
pub async fn run_script<E, F>(script: F) -> ExitCode
where
    E: std::fmt::Display,
    F: Future<Output = Result<(), E>>,
{
    match script.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "script failed");
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
