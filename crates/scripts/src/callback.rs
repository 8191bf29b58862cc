//! Correlating a randomness request with the oracle's fulfilment.
//!
//! The request id is read from the request transaction's own receipt. The callback is then found
//! with a log filter keyed on that id, polling `eth_getLogs` from the request block forward until
//! the fulfilment shows up, the timeout elapses or the wait is cancelled.

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
    transports::{RpcError, TransportErrorKind},
};
use qrng_contracts::qrng_requester::QrngRequester::{ReceivedUint256Array, RequestedUint256Array};
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default time to wait for the oracle to fulfil a request.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
/// Default delay between two `eth_getLogs` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Errors while correlating a request with its callback
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// rpc transport error
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// the request transaction did not emit a request event
    #[error("no RequestedUint256Array event from {requester} in tx {tx_hash}")]
    MissingRequestId {
        /// Requester contract that should have emitted the event.
        requester: Address,
        /// Request transaction hash.
        tx_hash: B256,
    },
    /// the callback did not arrive in time
    #[error("timed out after {timeout:?} waiting for callback of request {request_id}")]
    CallbackTimeout {
        /// Request being waited on.
        request_id: B256,
        /// How long we waited.
        timeout: Duration,
    },
    /// the wait was cancelled
    #[error("cancelled while waiting for callback of request {request_id}")]
    Cancelled {
        /// Request being waited on.
        request_id: B256,
    },
}

/// Source of chain logs. Implemented for any [`Provider`] through [`RpcLogSource`].
pub trait LogSource: Send + Sync {
    /// Latest block number known to the node.
    fn latest_block(&self) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Logs matching `filter`.
    fn logs(&self, filter: &Filter) -> impl Future<Output = Result<Vec<Log>, Error>> + Send;
}

/// [`LogSource`] backed by a JSON-RPC provider.
#[derive(Debug, Clone)]
pub struct RpcLogSource<P> {
    provider: P,
}

impl<P> RpcLogSource<P> {
    /// Create a new instance of [Self].
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: Provider> LogSource for RpcLogSource<P> {
    async fn latest_block(&self) -> Result<u64, Error> {
        self.provider.get_block_number().await.map_err(Into::into)
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        self.provider.get_logs(filter).await.map_err(Into::into)
    }
}

/// How long and how often to look for the callback.
#[derive(Debug, Clone, Copy)]
pub struct CallbackWait {
    /// Give up after this long.
    pub timeout: Duration,
    /// Delay between polls.
    pub poll_interval: Duration,
}

/// What the callback carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The random values, in the order the contract emitted them.
    Values(Vec<U256>),
    /// A callback for the request arrived but its payload could not be decoded.
    Malformed,
}

/// Find the request id in the logs of the request transaction.
///
/// Only `RequestedUint256Array` events emitted by `requester` are considered, other logs from the
/// same transaction are skipped.
pub fn request_id_from_logs(
    logs: &[Log],
    requester: Address,
    tx_hash: B256,
) -> Result<B256, Error> {
    logs.iter()
        .filter(|log| log.address() == requester)
        .filter(|log| log.topics().first() == Some(&RequestedUint256Array::SIGNATURE_HASH))
        .find_map(|log| log.log_decode::<RequestedUint256Array>().ok())
        .map(|log| log.inner.data.requestId)
        .ok_or(Error::MissingRequestId { requester, tx_hash })
}

/// Filter for the callback of `request_id`, keyed on the indexed request id.
pub fn callback_filter(requester: Address, request_id: B256) -> Filter {
    Filter::new()
        .address(requester)
        .event_signature(ReceivedUint256Array::SIGNATURE_HASH)
        .topic1(request_id)
}

/// Wait for the callback of `request_id`, starting the search at `from_block`.
pub async fn wait_for_callback<S: LogSource>(
    source: &S,
    requester: Address,
    request_id: B256,
    from_block: u64,
    wait: CallbackWait,
    cancel: &CancellationToken,
) -> Result<CallbackOutcome, Error> {
    let poll = poll_callback(source, requester, request_id, from_block, wait.poll_interval);

    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled { request_id }),
        result = tokio::time::timeout(wait.timeout, poll) => match result {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::CallbackTimeout { request_id, timeout: wait.timeout }),
        },
    }
}

async fn poll_callback<S: LogSource>(
    source: &S,
    requester: Address,
    request_id: B256,
    from_block: u64,
    poll_interval: Duration,
) -> Result<CallbackOutcome, Error> {
    let filter = callback_filter(requester, request_id);
    let mut next_block = from_block;

    loop {
        let latest = source.latest_block().await?;

        if latest >= next_block {
            debug!(from = next_block, to = latest, ?request_id, "polling for callback");
            let logs = source.logs(&filter.clone().from_block(next_block).to_block(latest)).await?;

            if let Some(log) =
                logs.iter().find(|log| is_callback_for(log, requester, request_id))
            {
                return Ok(decode_callback(log));
            }
            next_block = latest + 1;
        }

        tokio::time::sleep(poll_interval).await;
    }
}

fn is_callback_for(log: &Log, requester: Address, request_id: B256) -> bool {
    log.address() == requester
        && log.topics().first() == Some(&ReceivedUint256Array::SIGNATURE_HASH)
        && log.topics().get(1) == Some(&request_id)
}

fn decode_callback(log: &Log) -> CallbackOutcome {
    match log.log_decode::<ReceivedUint256Array>() {
        Ok(decoded) => CallbackOutcome::Values(decoded.inner.data.response),
        Err(error) => {
            warn!(?error, tx_hash = ?log.transaction_hash, "undecodable callback payload");
            CallbackOutcome::Malformed
        }
    }
}

/// Console lines for the received values, one per value.
pub fn format_numbers(values: &[U256]) -> Vec<String> {
    values.iter().enumerate().map(|(index, value)| format!("Number {index}: {value}")).collect()
}
