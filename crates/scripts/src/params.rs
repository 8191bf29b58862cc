//! Point a requester contract at an oracle endpoint and sponsor wallet.

use crate::tx;
use alloy::{
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::TransactionReceipt,
};
use qrng_contracts::qrng_requester::QrngRequester;
use std::io::{self, Write};
use tracing::info;

/// Errors from setting the request parameters
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the transaction could not be broadcast or failed
    #[error(transparent)]
    Tx(#[from] tx::Error),
    /// progress could not be written
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

/// Parameters written by `setRequestParameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestParameters {
    /// Airnode address.
    pub airnode: Address,
    /// Endpoint id of the `uint256[]` endpoint.
    pub endpoint_id: B256,
    /// Wallet the airnode uses to send the fulfilment.
    pub sponsor_wallet: Address,
}

/// Submit `setRequestParameters` to `requester` and wait for it to be included, writing progress
/// to `out`.
///
/// Success is judged on the receipt status only, the stored values are not read back.
pub async fn set_request_parameters<P: Provider, W: Write>(
    provider: &P,
    requester: Address,
    params: RequestParameters,
    confirmations: u64,
    out: &mut W,
) -> Result<TransactionReceipt, Error> {
    let contract = QrngRequester::new(requester, provider);

    info!(?requester, ?params, "setting request parameters");
    writeln!(out, "Setting Params, waiting for it to be confirmed...")?;

    let pending = contract
        .setRequestParameters(params.airnode, params.endpoint_id, params.sponsor_wallet)
        .send()
        .await
        .map_err(tx::Error::from)?;
    let receipt = tx::confirm(pending, confirmations).await?;

    writeln!(out, "Request Parameters set")?;
    Ok(receipt)
}
