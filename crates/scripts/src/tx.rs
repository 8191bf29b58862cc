//! Broadcasting transactions and waiting for them to land.

use alloy::{
    network::Ethereum,
    primitives::TxHash,
    providers::{PendingTransactionBuilder, PendingTransactionError},
    rpc::types::TransactionReceipt,
};
use tracing::{error, info};

/// Transaction errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// the transaction could not be signed or broadcast
    #[error("error while broadcasting tx: {0}")]
    TxBroadcast(#[from] alloy::contract::Error),
    /// rpc transport error
    #[error(transparent)]
    Rpc(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    /// error while waiting for tx inclusion
    #[error("error while waiting for tx inclusion: {0}")]
    TxInclusion(#[from] PendingTransactionError),
    /// the transaction was mined but reverted
    #[error("transaction failed: {tx_hash}")]
    TxFailed {
        /// Hash of the reverted transaction.
        tx_hash: TxHash,
    },
}

/// Wait for `pending` to be included with `confirmations` confirmations.
///
/// A receipt with a failure status is turned into [`Error::TxFailed`].
pub async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    confirmations: u64,
) -> Result<TransactionReceipt, Error> {
    let tx_hash = *pending.tx_hash();
    info!(?tx_hash, confirmations, "waiting for tx inclusion");

    let receipt =
        pending.with_required_confirmations(confirmations).get_receipt().await.map_err(|error| {
            error!(?error, ?tx_hash, "tx inclusion failed");
            Error::TxInclusion(error)
        })?;

    ensure_success(receipt)
}

/// Pass the receipt through if its status is success.
pub fn ensure_success(receipt: TransactionReceipt) -> Result<TransactionReceipt, Error> {
    if !receipt.status() {
        error!(tx_hash = ?receipt.transaction_hash, receipt.block_number, "tx reverted");
        return Err(Error::TxFailed { tx_hash: receipt.transaction_hash });
    }

    info!(
        receipt.transaction_index,
        receipt.block_number,
        ?receipt.block_hash,
        ?receipt.transaction_hash,
        "tx included"
    );
    Ok(receipt)
}
