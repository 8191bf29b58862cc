//! Request random numbers and wait for the oracle to deliver them.

use crate::{
    callback::{self, CallbackOutcome, CallbackWait, RpcLogSource},
    tx,
};
use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
};
use qrng_contracts::qrng_requester::QrngRequester;
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors from the random number request flow
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the request transaction failed
    #[error(transparent)]
    Tx(#[from] tx::Error),
    /// the callback could not be correlated or did not arrive
    #[error(transparent)]
    Callback(#[from] callback::Error),
    /// progress could not be written
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

/// Printed when the callback payload does not have the expected shape.
pub const MALFORMED_RESPONSE: &str = "Arguments not found or not in expected format.";

/// Result of a fulfilled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfilled {
    /// Correlation id of the request.
    pub request_id: B256,
    /// What the callback carried.
    pub outcome: CallbackOutcome,
}

/// Request `count` random numbers from `requester` and wait for the callback, writing progress
/// to `out`.
pub async fn request_random_numbers<P: Provider, W: Write>(
    provider: &P,
    requester: Address,
    count: u64,
    confirmations: u64,
    wait: CallbackWait,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<Fulfilled, Error> {
    let contract = QrngRequester::new(requester, provider);

    writeln!(out, "Requesting Random Number...")?;
    let pending = contract
        .makeRequestUint256Array(U256::from(count))
        .send()
        .await
        .map_err(tx::Error::from)?;
    let receipt = tx::confirm(pending, confirmations).await?;

    let request_id = callback::request_id_from_logs(
        receipt.inner.logs(),
        requester,
        receipt.transaction_hash,
    )?;
    writeln!(out, "requestID: {request_id}")?;
    writeln!(out, "Random Numbers Requested...")?;

    // The callback can land in the same block as the request on fast chains.
    let from_block = receipt.block_number.unwrap_or_default();
    info!(?request_id, from_block, timeout = ?wait.timeout, "waiting for callback");

    let source = RpcLogSource::new(provider);
    let outcome =
        callback::wait_for_callback(&source, requester, request_id, from_block, wait, cancel)
            .await?;

    if let CallbackOutcome::Values(values) = &outcome {
        if values.len() as u64 != count {
            warn!(requested = count, received = values.len(), ?request_id, "unexpected value count");
        }
    }

    Ok(Fulfilled { request_id, outcome })
}

/// Write the outcome of a request to `out`.
///
/// A malformed payload is reported with [`MALFORMED_RESPONSE`] and is not an error.
pub fn print_outcome<W: Write>(out: &mut W, outcome: &CallbackOutcome) -> io::Result<()> {
    match outcome {
        CallbackOutcome::Values(values) => {
            for line in callback::format_numbers(values) {
                writeln!(out, "{line}")?;
            }
        }
        CallbackOutcome::Malformed => writeln!(out, "{MALFORMED_RESPONSE}")?,
    }
    Ok(())
}
