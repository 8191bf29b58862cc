//! Derive the sponsor wallet of a requester and send it native currency.

use crate::tx;
use alloy::{
    network::TransactionBuilder,
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use std::io::{self, Write};
use tracing::info;

/// Errors from funding a sponsor wallet
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the sponsor wallet could not be derived
    #[error("sponsor wallet derivation: {0}")]
    Derivation(#[from] qrng_sponsor::Error),
    /// the transfer could not be broadcast or failed
    #[error(transparent)]
    Tx(#[from] tx::Error),
    /// progress could not be written
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}

/// Inputs for funding a sponsor wallet.
#[derive(Debug, Clone)]
pub struct FundRequest {
    /// Airnode address.
    pub airnode: Address,
    /// Airnode extended public key.
    pub airnode_xpub: String,
    /// Requester contract, i.e. the sponsor.
    pub requester: Address,
    /// Amount in wei.
    pub amount: U256,
    /// Amount as the user wrote it, for display.
    pub amount_display: String,
}

/// A confirmed funding transfer.
#[derive(Debug)]
pub struct Funded {
    /// The funded sponsor wallet.
    pub sponsor_wallet: Address,
    /// Receipt of the transfer.
    pub receipt: TransactionReceipt,
}

/// Build the single transfer that funds `sponsor_wallet`.
pub fn transfer_request(sponsor_wallet: Address, amount: U256) -> TransactionRequest {
    TransactionRequest::default().with_to(sponsor_wallet).with_value(amount)
}

/// Derive the sponsor wallet and transfer `request.amount` to it, writing progress to `out`.
///
/// `Sponsor wallet funded` is only written once the transfer is included with a success status.
pub async fn fund_sponsor<P: Provider, W: Write>(
    provider: &P,
    request: &FundRequest,
    confirmations: u64,
    out: &mut W,
) -> Result<Funded, Error> {
    let sponsor_wallet = qrng_sponsor::derive_sponsor_wallet(
        &request.airnode_xpub,
        request.airnode,
        request.requester,
    )?;
    writeln!(out, "Sponsor wallet address: {sponsor_wallet}")?;
    info!(
        ?sponsor_wallet,
        airnode = ?request.airnode,
        requester = ?request.requester,
        "derived sponsor wallet"
    );

    let pending = provider
        .send_transaction(transfer_request(sponsor_wallet, request.amount))
        .await
        .map_err(tx::Error::from)?;
    writeln!(out, "Funding sponsor wallet at {sponsor_wallet} with {} ...", request.amount_display)?;

    let receipt = tx::confirm(pending, confirmations).await?;
    writeln!(out, "Sponsor wallet funded")?;

    Ok(Funded { sponsor_wallet, receipt })
}
